use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use nom::bytes::complete::take;
use nom::combinator::map;
use nom::error::Error;
use nom::multi::count;
use nom::number::complete::{le_i16, le_u8};
use nom::sequence::tuple;
use nom::{IResult, Parser};

use super::util::short_name;
use crate::archive::wad::{write_short_name, BareWAD, WADMapEntryBlock};
use crate::errors::{nom_to_result, ErrorKind, Result};
use crate::map::MapFormat;

fn hexen_args(input: &[u8]) -> IResult<&[u8], [u8; 5]> {
    map(take(5usize), |bytes: &[u8]| {
        let mut args = [0; 5];
        args.copy_from_slice(bytes);
        args
    })(input)
}


// NOTE: vertex and sidedef indices are i16 in vanilla, but most source ports
// read them as u16, which is what the level loader does
#[derive(Debug, Clone, PartialEq)]
pub struct BareDoomLine {
    pub v0: i16,
    pub v1: i16,
    pub flags: i16,
    pub special: i16,
    pub sector_tag: i16,
    // NOTE: -1 to mean none
    pub front_sidedef: i16,
    pub back_sidedef: i16,
}

impl BareDoomLine {
    pub fn write_to(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_i16::<LittleEndian>(self.v0)?;
        writer.write_i16::<LittleEndian>(self.v1)?;
        writer.write_i16::<LittleEndian>(self.flags)?;
        writer.write_i16::<LittleEndian>(self.special)?;
        writer.write_i16::<LittleEndian>(self.sector_tag)?;
        writer.write_i16::<LittleEndian>(self.front_sidedef)?;
        writer.write_i16::<LittleEndian>(self.back_sidedef)?;
        Ok(())
    }
}

fn doom_line(input: &[u8]) -> IResult<&[u8], BareDoomLine> {
    let (input, (v0, v1, flags, special, sector_tag, front_sidedef, back_sidedef)) =
        tuple((le_i16, le_i16, le_i16, le_i16, le_i16, le_i16, le_i16))(input)?;
    Ok((input, BareDoomLine { v0, v1, flags, special, sector_tag, front_sidedef, back_sidedef }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BareHexenLine {
    pub v0: i16,
    pub v1: i16,
    pub flags: i16,
    pub special: u8,
    pub args: [u8; 5],
    // NOTE: -1 to mean none
    pub front_sidedef: i16,
    pub back_sidedef: i16,
}

impl BareHexenLine {
    pub fn write_to(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_i16::<LittleEndian>(self.v0)?;
        writer.write_i16::<LittleEndian>(self.v1)?;
        writer.write_i16::<LittleEndian>(self.flags)?;
        writer.write_u8(self.special)?;
        writer.write_all(&self.args)?;
        writer.write_i16::<LittleEndian>(self.front_sidedef)?;
        writer.write_i16::<LittleEndian>(self.back_sidedef)?;
        Ok(())
    }
}

fn hexen_line(input: &[u8]) -> IResult<&[u8], BareHexenLine> {
    let (input, (v0, v1, flags, special, args, front_sidedef, back_sidedef)) =
        tuple((le_i16, le_i16, le_i16, le_u8, hexen_args, le_i16, le_i16))(input)?;
    Ok((input, BareHexenLine { v0, v1, flags, special, args, front_sidedef, back_sidedef }))
}

/// What the level loader needs from a line, whichever format it came from.
pub trait BareBinaryLine {
    fn vertex_indices(&self) -> (i16, i16);
    fn side_indices(&self) -> (i16, i16);
    fn flags(&self) -> i16;
    fn special(&self) -> u16;
    fn sector_tag(&self) -> u16;
}

impl BareBinaryLine for BareDoomLine {
    fn vertex_indices(&self) -> (i16, i16) {
        (self.v0, self.v1)
    }
    fn side_indices(&self) -> (i16, i16) {
        (self.front_sidedef, self.back_sidedef)
    }
    fn flags(&self) -> i16 {
        self.flags
    }
    fn special(&self) -> u16 {
        self.special as u16
    }
    fn sector_tag(&self) -> u16 {
        self.sector_tag as u16
    }
}

impl BareBinaryLine for BareHexenLine {
    fn vertex_indices(&self) -> (i16, i16) {
        (self.v0, self.v1)
    }
    fn side_indices(&self) -> (i16, i16) {
        (self.front_sidedef, self.back_sidedef)
    }
    fn flags(&self) -> i16 {
        self.flags
    }
    fn special(&self) -> u16 {
        u16::from(self.special)
    }
    // Hexen specials take their tag from the arguments, if at all
    fn sector_tag(&self) -> u16 {
        0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BareSide<'tex> {
    pub x_offset: i16,
    pub y_offset: i16,
    pub upper_texture: &'tex str,
    pub lower_texture: &'tex str,
    pub middle_texture: &'tex str,
    pub sector: i16,
}

impl<'t> BareSide<'t> {
    pub fn write_to(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_i16::<LittleEndian>(self.x_offset)?;
        writer.write_i16::<LittleEndian>(self.y_offset)?;
        write_short_name(writer, self.upper_texture)?;
        write_short_name(writer, self.lower_texture)?;
        write_short_name(writer, self.middle_texture)?;
        writer.write_i16::<LittleEndian>(self.sector)?;
        Ok(())
    }
}

fn side(input: &[u8]) -> IResult<&[u8], BareSide> {
    let (input, (x_offset, y_offset, upper_texture, lower_texture, middle_texture, sector)) =
        tuple((le_i16, le_i16, short_name, short_name, short_name, le_i16))(input)?;
    Ok((input, BareSide { x_offset, y_offset, upper_texture, lower_texture, middle_texture, sector }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BareVertex {
    pub x: i16,
    pub y: i16,
}

impl BareVertex {
    pub fn write_to(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_i16::<LittleEndian>(self.x)?;
        writer.write_i16::<LittleEndian>(self.y)?;
        Ok(())
    }
}

fn vertex(input: &[u8]) -> IResult<&[u8], BareVertex> {
    let (input, (x, y)) = tuple((le_i16, le_i16))(input)?;
    Ok((input, BareVertex { x, y }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BareSector<'tex> {
    pub floor_height: i16,
    pub ceiling_height: i16,
    pub floor_texture: &'tex str,
    pub ceiling_texture: &'tex str,
    pub light: i16,
    pub sector_type: i16,
    pub sector_tag: i16,
}

impl<'t> BareSector<'t> {
    pub fn write_to(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_i16::<LittleEndian>(self.floor_height)?;
        writer.write_i16::<LittleEndian>(self.ceiling_height)?;
        write_short_name(writer, self.floor_texture)?;
        write_short_name(writer, self.ceiling_texture)?;
        writer.write_i16::<LittleEndian>(self.light)?;
        writer.write_i16::<LittleEndian>(self.sector_type)?;
        writer.write_i16::<LittleEndian>(self.sector_tag)?;
        Ok(())
    }
}

fn sector(input: &[u8]) -> IResult<&[u8], BareSector> {
    let (input, (floor_height, ceiling_height, floor_texture, ceiling_texture, light, sector_type, sector_tag)) =
        tuple((le_i16, le_i16, short_name, short_name, le_i16, le_i16, le_i16))(input)?;
    Ok((input, BareSector {
        floor_height,
        ceiling_height,
        floor_texture,
        ceiling_texture,
        light,
        sector_type,
        sector_tag,
    }))
}

/// Parses a lump made of fixed-size records.  A partial record at the end is
/// an error.
fn records<'a, O, P>(whence: &'static str, buf: &'a [u8], record_size: usize, parser: P) -> Result<Vec<O>>
where
    P: Parser<&'a [u8], O, Error<&'a [u8]>>,
{
    if buf.len() % record_size != 0 {
        bail!(ErrorKind::TruncatedData(whence));
    }
    nom_to_result(whence, buf, count(parser, buf.len() / record_size)(buf))
}


#[derive(Debug, Clone, PartialEq)]
pub struct BareBinaryMap<'a, L: BareBinaryLine> {
    pub vertices: Vec<BareVertex>,
    pub sectors: Vec<BareSector<'a>>,
    pub sides: Vec<BareSide<'a>>,
    pub lines: Vec<L>,
}

/// The result of parsing a Doom-format map definition.  The contained
/// structures have not been changed in any way.  Everything is public, and
/// nothing is preventing you from meddling with the contained data in a way
/// that might make it invalid.
pub type BareDoomMap<'a> = BareBinaryMap<'a, BareDoomLine>;

/// The result of parsing a Hexen-format map definition.  Same caveats as
/// `BareDoomMap`.
pub type BareHexenMap<'a> = BareBinaryMap<'a, BareHexenLine>;

#[derive(Debug)]
pub enum BareMap<'a> {
    Doom(BareDoomMap<'a>),
    Hexen(BareHexenMap<'a>),
}

fn map_lump<'a>(archive: &BareWAD<'a>, index: Option<usize>, name: &'static str) -> Result<&'a [u8]> {
    let index = index.ok_or(ErrorKind::MissingMapLump(name))?;
    archive.entry_slice(index)
}

/// Parses the geometry lumps of one map.  THINGS and the prebuilt node lumps
/// are not read.
pub fn parse_doom_map<'a>(archive: &BareWAD<'a>, range: &WADMapEntryBlock) -> Result<BareMap<'a>> {
    let buf = map_lump(archive, range.vertexes_index, "VERTEXES")?;
    let vertices = records("VERTEXES lump", buf, 4, vertex)?;

    let buf = map_lump(archive, range.sectors_index, "SECTORS")?;
    let sectors = records("SECTORS lump", buf, 26, sector)?;

    let buf = map_lump(archive, range.sidedefs_index, "SIDEDEFS")?;
    let sides = records("SIDEDEFS lump", buf, 30, side)?;

    let buf = map_lump(archive, range.linedefs_index, "LINEDEFS")?;
    let bare_map = match range.format {
        MapFormat::Doom => {
            let lines = records("LINEDEFS lump", buf, 14, doom_line)?;
            BareMap::Doom(BareDoomMap { vertices, sectors, sides, lines })
        }
        MapFormat::Hexen => {
            let lines = records("LINEDEFS lump", buf, 16, hexen_line)?;
            BareMap::Hexen(BareHexenMap { vertices, sectors, sides, lines })
        }
    };

    debug!("Parsed {} ({:?} format)", range.name, range.format);
    Ok(bare_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::wad::{write_wad, WADType};
    use crate::parse::wad::parse_wad;
    use crate::test_maps;

    #[test]
    fn doom_map_survives_a_trip_through_a_wad() {
        let original = test_maps::two_rooms();
        let buf = test_maps::doom_map_wad("E1M1", &original);

        let wad = parse_wad(&buf).unwrap();
        let block = wad.find_map("E1M1").unwrap();
        match parse_doom_map(&wad, &block).unwrap() {
            BareMap::Doom(parsed) => assert_eq!(parsed, original),
            BareMap::Hexen(_) => panic!("no BEHAVIOR lump, so this is Doom format"),
        }
    }

    #[test]
    fn hexen_lines() {
        let line = BareHexenLine {
            v0: 1,
            v1: 2,
            flags: 0x200,
            special: 80,
            args: [1, 2, 3, 4, 5],
            front_sidedef: 0,
            back_sidedef: -1,
        };
        let mut buf: Vec<u8> = Vec::new();
        line.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 16);

        let lines = records("LINEDEFS lump", &buf, 16, hexen_line).unwrap();
        assert_eq!(lines, vec![line]);
        assert_eq!(lines[0].special(), 80);
        assert_eq!(lines[0].side_indices(), (0, -1));
    }

    #[test]
    fn partial_records_are_truncation() {
        let buf = [0u8; 10];
        match records("VERTEXES lump", &buf, 4, vertex) {
            Err(err) => match *err.kind() {
                ErrorKind::TruncatedData("VERTEXES lump") => {}
                ref other => panic!("unexpected error: {}", other),
            },
            Ok(_) => panic!("10 bytes is not a whole number of vertices"),
        }
    }

    #[test]
    fn bogus_texture_names_are_invalid() {
        let mut buf: Vec<u8> = Vec::new();
        BareSide {
            x_offset: 0,
            y_offset: 0,
            upper_texture: "-",
            lower_texture: "-",
            middle_texture: "STARTAN3",
            sector: 0,
        }.write_to(&mut buf).unwrap();
        buf[4] = 0x07;
        match records("SIDEDEFS lump", &buf, 30, side) {
            Err(err) => match *err.kind() {
                ErrorKind::InvalidData(_, 4) => {}
                ref other => panic!("unexpected error: {}", other),
            },
            Ok(_) => panic!("texture name contains a control character"),
        }
    }

    #[test]
    fn missing_lumps() {
        let mut buf: Vec<u8> = Vec::new();
        write_wad(&mut buf, WADType::PWAD, &[("MAP01", &[][..]), ("LINEDEFS", &[][..])]).unwrap();
        let wad = parse_wad(&buf).unwrap();
        let block = wad.find_map("MAP01").unwrap();
        match parse_doom_map(&wad, &block) {
            Err(err) => match *err.kind() {
                ErrorKind::MissingMapLump("VERTEXES") => {}
                ref other => panic!("unexpected error: {}", other),
            },
            Ok(_) => panic!("map has no vertices"),
        }
    }
}
