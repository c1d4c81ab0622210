pub mod map;
pub mod wad;

mod util;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::combinator::{eof, map, verify};
use nom::number::complete::le_u8;
use nom::sequence::{delimited, tuple};
use nom::IResult;

use crate::map::MapName;


// Map name parsing -- doesn't clearly belong anywhere in particular

fn digit(input: &[u8]) -> IResult<&[u8], u8> {
    verify(le_u8, u8::is_ascii_digit)(input)
}

fn exmy_map_name(input: &[u8]) -> IResult<&[u8], MapName> {
    let (input, (_, e, _, m, _)) = tuple((tag("E"), digit, tag("M"), digit, eof))(input)?;
    Ok((input, MapName::ExMy(e - b'0', m - b'0')))
}

fn mapxx_map_name(input: &[u8]) -> IResult<&[u8], MapName> {
    let number = verify(
        map(tuple((digit, digit)), |(tens, ones): (u8, u8)| (tens - b'0') * 10 + (ones - b'0')),
        |&xx: &u8| xx >= 1 && xx <= 32);
    let (input, xx) = delimited(tag("MAP"), number, eof)(input)?;
    Ok((input, MapName::MAPxx(xx)))
}

/// Recognizes the lump names vanilla Doom uses for map markers.
pub fn vanilla_map_name(input: &[u8]) -> IResult<&[u8], MapName> {
    alt((exmy_map_name, mapxx_map_name))(input)
}
