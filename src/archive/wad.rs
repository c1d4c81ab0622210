use std::io::Write;
use std::iter::{Enumerate, Peekable};
use std::slice;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::errors::{ErrorKind, Result};
use crate::map::{MapFormat, MapName};
use crate::parse::vanilla_map_name;


/// Type of the WAD.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WADType {
    /// full standalone game
    IWAD,
    /// patch wad, a small mod
    PWAD,
}

impl WADType {
    fn magic(self) -> &'static [u8; 4] {
        match self {
            WADType::IWAD => b"IWAD",
            WADType::PWAD => b"PWAD",
        }
    }
}

/// Low-level interface to a parsed WAD: the header and directory, borrowing
/// the file's bytes.
#[derive(Debug)]
pub struct BareWAD<'n> {
    pub buffer: &'n [u8],
    pub header: BareWADHeader,
    pub directory: Vec<BareWADDirectoryEntry<'n>>,
}

impl<'n> BareWAD<'n> {
    pub fn entry_slice(&self, index: usize) -> Result<&'n [u8]> {
        let entry = &self.directory[index];
        entry.extract_slice(self.buffer)
            .ok_or_else(|| ErrorKind::LumpOutOfBounds(index, entry.start(), entry.end()).into())
    }

    pub fn first_entry(&self, name: &str) -> Option<&'n [u8]> {
        self.directory.iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.extract_slice(self.buffer))
    }

    pub fn iter_maps(&self) -> impl Iterator<Item=WADMapEntryBlock> + '_ {
        self.iter().filter_map(|item|
            if let WADItem::Map(map_block) = item {
                Some(map_block)
            }
            else {
                None
            }
        )
    }

    /// Finds the map with the given marker name, ignoring case.
    pub fn find_map(&self, name: &str) -> Result<WADMapEntryBlock> {
        self.iter_maps()
            .find(|block| block.name.to_string().eq_ignore_ascii_case(name))
            .ok_or_else(|| ErrorKind::MapNotFound(name.to_owned()).into())
    }

    pub fn iter(&self) -> WADIterator {
        WADIterator {
            entry_iter: self.directory.iter().enumerate().peekable(),
        }
    }
}

#[derive(Debug)]
pub struct BareWADHeader {
    pub identification: WADType,
    pub numlumps: u32,
    pub infotableofs: u32,
}

#[derive(Debug)]
pub struct BareWADDirectoryEntry<'name> {
    pub filepos: u32,
    pub size: u32,
    pub name: &'name str,
}

impl<'n> BareWADDirectoryEntry<'n> {
    fn start(&self) -> usize {
        self.filepos as usize
    }

    fn end(&self) -> usize {
        self.start() + self.size as usize
    }

    /// Extract the slice described by this entry from a buffer, if it fits.
    pub fn extract_slice<'b>(&self, buf: &'b [u8]) -> Option<&'b [u8]> {
        buf.get(self.start()..self.end())
    }
}

// -----------------------------------------------------------------------------
// Map stuff

/// Lumps that may follow a map marker.
const MAP_LUMPS: [&str; 11] = [
    "THINGS",
    "LINEDEFS",
    "SIDEDEFS",
    "VERTEXES",
    "SEGS",
    "SSECTORS",
    "NODES",
    "SECTORS",
    "REJECT",
    "BLOCKMAP",
    "BEHAVIOR",
];

#[derive(Debug)]
pub enum WADItem<'a> {
    Map(WADMapEntryBlock),
    Entry(&'a BareWADDirectoryEntry<'a>),
}

pub struct WADIterator<'a> {
    entry_iter: Peekable<Enumerate<slice::Iter<'a, BareWADDirectoryEntry<'a>>>>,
}

impl<'a> Iterator for WADIterator<'a> {
    type Item = WADItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (i, entry) = self.entry_iter.next()?;
        let name = match vanilla_map_name(entry.name.as_bytes()) {
            Ok((_, name)) => name,
            Err(_) => return Some(WADItem::Entry(entry)),
        };

        let mut range = WADMapEntryBlock {
            format: MapFormat::Doom,
            name,
            marker_index: i,
            last_index: i,

            things_index: None,
            linedefs_index: None,
            sidedefs_index: None,
            vertexes_index: None,
            sectors_index: None,
            behavior_index: None,
        };

        // Peek, so that the next map's marker (or any other lump) isn't consumed
        while let Some(&(i, entry)) = self.entry_iter.peek() {
            let lump = entry.name.to_ascii_uppercase();
            if !MAP_LUMPS.contains(&lump.as_str()) {
                break;
            }
            match lump.as_str() {
                "THINGS" => range.things_index = Some(i),
                "LINEDEFS" => range.linedefs_index = Some(i),
                "SIDEDEFS" => range.sidedefs_index = Some(i),
                "VERTEXES" => range.vertexes_index = Some(i),
                "SECTORS" => range.sectors_index = Some(i),
                "BEHAVIOR" => {
                    // The presence of a BEHAVIOR lump is the sole indication of Hexen format
                    range.behavior_index = Some(i);
                    range.format = MapFormat::Hexen;
                }
                // Prebuilt nodes and friends; we build our own
                _ => {}
            }
            range.last_index = i;
            self.entry_iter.next();
        }

        if range.last_index == range.marker_index {
            // A marker name with no map after it
            return Some(WADItem::Entry(entry));
        }
        Some(WADItem::Map(range))
    }
}

/// Directory indices of the lumps making up one map.
#[derive(Debug)]
pub struct WADMapEntryBlock {
    pub format: MapFormat,
    pub name: MapName,
    pub marker_index: usize,
    pub last_index: usize,

    pub things_index: Option<usize>,
    pub linedefs_index: Option<usize>,
    pub sidedefs_index: Option<usize>,
    pub vertexes_index: Option<usize>,
    pub sectors_index: Option<usize>,
    pub behavior_index: Option<usize>,
}

/// Writes a complete WAD: header, then the lump data in order, then the
/// directory.
pub fn write_wad(writer: &mut dyn Write, wadtype: WADType, lumps: &[(&str, &[u8])]) -> Result<()> {
    const HEADER_SIZE: u32 = 12;
    let data_size: usize = lumps.iter().map(|&(_, data)| data.len()).sum();

    writer.write_all(wadtype.magic())?;
    writer.write_u32::<LittleEndian>(lumps.len() as u32)?;
    writer.write_u32::<LittleEndian>(HEADER_SIZE + data_size as u32)?;
    for &(_, data) in lumps.iter() {
        writer.write_all(data)?;
    }

    let mut filepos = HEADER_SIZE;
    for &(name, data) in lumps.iter() {
        writer.write_u32::<LittleEndian>(filepos)?;
        writer.write_u32::<LittleEndian>(data.len() as u32)?;
        write_short_name(writer, name)?;
        filepos += data.len() as u32;
    }
    Ok(())
}

/// Writes an eight-byte, zero-padded name.  Longer names are cut short.
pub fn write_short_name(writer: &mut dyn Write, name: &str) -> Result<()> {
    let mut field = [0u8; 8];
    for (slot, &byte) in field.iter_mut().zip(name.as_bytes()) {
        *slot = byte;
    }
    writer.write_all(&field)?;
    Ok(())
}
