use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::combinator::value;
use nom::multi::count;
use nom::number::complete::le_u32;
use nom::sequence::tuple;
use nom::{Err, IResult, Needed};

use super::util::short_name;
use crate::archive::wad::{BareWAD, BareWADDirectoryEntry, BareWADHeader, WADType};
use crate::errors::{nom_to_result, ErrorKind, Result};

/// Size of one directory entry: offset, size, name.
const DIRECTORY_ENTRY_SIZE: usize = 16;

fn wad_type(input: &[u8]) -> IResult<&[u8], WADType> {
    alt((value(WADType::IWAD, tag("IWAD")), value(WADType::PWAD, tag("PWAD"))))(input)
}

fn wad_header(input: &[u8]) -> IResult<&[u8], BareWADHeader> {
    let (input, (identification, numlumps, infotableofs)) = tuple((wad_type, le_u32, le_u32))(input)?;
    Ok((input, BareWADHeader { identification, numlumps, infotableofs }))
}

fn wad_entry(input: &[u8]) -> IResult<&[u8], BareWADDirectoryEntry> {
    let (input, (filepos, size, name)) = tuple((le_u32, le_u32, short_name))(input)?;
    Ok((input, BareWADDirectoryEntry { filepos, size, name }))
}

fn wad_directory<'a>(buf: &'a [u8], header: &BareWADHeader) -> IResult<&'a [u8], Vec<BareWADDirectoryEntry<'a>>> {
    let lumpct = header.numlumps as usize;
    let offset = header.infotableofs as usize;
    let tablelen = lumpct * DIRECTORY_ENTRY_SIZE;
    if buf.len() < offset + tablelen {
        return Err(Err::Incomplete(Needed::new(offset + tablelen - buf.len())));
    }

    count(wad_entry, lumpct)(&buf[offset..])
}

/// Parses a WAD's header and directory.  Lump contents are not looked at, but
/// every lump is checked to lie inside `buf`.
pub fn parse_wad(buf: &[u8]) -> Result<BareWAD> {
    if buf.len() >= 4 && wad_type(buf).is_err() {
        bail!(ErrorKind::InvalidMagic);
    }
    let header = nom_to_result("wad header", buf, wad_header(buf))?;
    let directory = nom_to_result("wad directory", buf, wad_directory(buf, &header))?;

    for (index, entry) in directory.iter().enumerate() {
        let start = entry.filepos as usize;
        let end = start + entry.size as usize;
        if end > buf.len() {
            bail!(ErrorKind::LumpOutOfBounds(index, start, end));
        }
    }

    debug!("Read {:?} with {} lumps", header.identification, directory.len());
    Ok(BareWAD { buffer: buf, header, directory })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::wad::write_wad;

    fn expect_kind(result: Result<BareWAD>, check: fn(&ErrorKind) -> bool) {
        match result {
            Err(ref err) if check(err.kind()) => {}
            Err(err) => panic!("unexpected error: {}", err),
            Ok(_) => panic!("should not parse"),
        }
    }

    #[test]
    fn header_and_directory() {
        let mut buf: Vec<u8> = Vec::new();
        write_wad(&mut buf, WADType::PWAD, &[("E1M1", &[][..]), ("THINGS", &[1, 2, 3][..])]).unwrap();

        let wad = parse_wad(&buf).unwrap();
        assert_eq!(wad.header.numlumps, 2);
        assert_eq!(wad.directory.len(), 2);
        assert_eq!(wad.directory[0].name, "E1M1");
        assert_eq!(wad.directory[1].name, "THINGS");
        assert_eq!(wad.entry_slice(1).unwrap(), &[1, 2, 3]);
        assert_eq!(wad.first_entry("THINGS"), Some(&[1, 2, 3][..]));
        assert_eq!(wad.first_entry("SECTORS"), None);
    }

    #[test]
    fn bad_magic() {
        expect_kind(parse_wad(b"JWAD\0\0\0\0\x0c\0\0\0"), |kind| match *kind {
            ErrorKind::InvalidMagic => true,
            _ => false,
        });
    }

    #[test]
    fn truncated_directory() {
        let mut buf: Vec<u8> = Vec::new();
        write_wad(&mut buf, WADType::IWAD, &[("MAP01", &[][..])]).unwrap();
        buf.truncate(buf.len() - 4);
        expect_kind(parse_wad(&buf), |kind| match *kind {
            ErrorKind::TruncatedData(_) => true,
            _ => false,
        });
    }

    #[test]
    fn lump_past_the_end() {
        let mut buf: Vec<u8> = Vec::new();
        write_wad(&mut buf, WADType::IWAD, &[("MAP01", &[][..]), ("LINEDEFS", &[0; 14][..])]).unwrap();
        // bump the second lump's size well past the end of the file
        let size_at = buf.len() - DIRECTORY_ENTRY_SIZE + 4;
        buf[size_at] = 0xff;
        expect_kind(parse_wad(&buf), |kind| match *kind {
            ErrorKind::LumpOutOfBounds(1, _, _) => true,
            _ => false,
        });
    }
}
