use std::str;

use nom::error::{Error, ErrorKind};
use nom::{Err, IResult, Needed};


/// Parses a zero-padded ASCII string occupying exactly `len` bytes.
pub fn fixed_length_ascii(input: &[u8], len: usize) -> IResult<&[u8], &str> {
    if input.len() < len {
        return Err(Err::Incomplete(Needed::new(len - input.len())));
    }

    let field = &input[..len];
    let end = field.iter().position(|&byte| byte == 0).unwrap_or(len);
    if let Some(bad) = field[..end].iter().position(|&byte| byte < 32 || byte > 126) {
        // Totally bogus character
        return Err(Err::Error(Error::new(&input[bad..], ErrorKind::Char)));
    }
    match str::from_utf8(&field[..end]) {
        Ok(name) => Ok((&input[len..], name)),
        Err(_) => Err(Err::Error(Error::new(input, ErrorKind::Char))),
    }
}

/// The eight-byte names used for lumps, textures and flats.
pub fn short_name(input: &[u8]) -> IResult<&[u8], &str> {
    fixed_length_ascii(input, 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_stop_at_the_first_nul() {
        let input = b"STARTAN3\0\0\0\0";
        assert_eq!(short_name(input), Ok((&b"\0\0\0\0"[..], "STARTAN3")));

        let input = b"FLAT5\0\0\0rest";
        assert_eq!(short_name(input), Ok((&b"rest"[..], "FLAT5")));
    }

    #[test]
    fn garbage_and_short_input_are_rejected() {
        assert!(short_name(b"BAD\x01NAME").is_err());
        match fixed_length_ascii(b"SHORT", 8) {
            Err(Err::Incomplete(_)) => {}
            other => panic!("expected incomplete, got {:?}", other),
        }
    }
}
