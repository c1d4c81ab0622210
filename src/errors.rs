use std::io;

use nom::IResult;

error_chain! {
    foreign_links {
        Io(io::Error);
    }

    errors {
        InvalidData(whence: &'static str, offset: usize) {
            description("invalid data")
            display("invalid data at offset {} while parsing {}", offset, whence)
        }
        TruncatedData(whence: &'static str) {
            description("unexpected end of input")
            display("unexpected end of input while parsing {}", whence)
        }
        InvalidMagic {
            description("invalid magic")
            display("invalid magic")
        }
        MissingMapLump(lump: &'static str) {
            description("missing required map lump")
            display("missing required map lump: {}", lump)
        }
        LumpOutOfBounds(index: usize, start: usize, end: usize) {
            description("lump lies outside the file")
            display("lump {} spans bytes {}..{}, which lie outside the file", index, start, end)
        }
        MapNotFound(name: String) {
            description("no such map")
            display("no map named {}", name)
        }
        BadReference(lump: &'static str, index: usize, value: usize) {
            description("reference to a nonexistent element")
            display("{} entry {} refers to nonexistent element {}", lump, index, value)
        }
        InvalidCellSize(size: f64) {
            description("invalid blockmap cell size")
            display("blockmap cell size must be positive, got {}", size)
        }
        DegenerateMap {
            description("map has no usable lines")
            display("map has no lines with nonzero length, so there is nothing to partition")
        }
    }
}

/// Converts the outcome of a nom parser run over `buf` into our own error type.
pub fn nom_to_result<'a, T>(whence: &'static str, buf: &'a [u8], result: IResult<&'a [u8], T>) -> Result<T> {
    match result {
        Ok((_, value)) => Ok(value),
        Err(nom::Err::Incomplete(_)) => Err(ErrorKind::TruncatedData(whence).into()),
        Err(nom::Err::Error(ref err)) if err.code == nom::error::ErrorKind::Eof => {
            Err(ErrorKind::TruncatedData(whence).into())
        }
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => {
            let offset = buf.len() - err.input.len();
            Err(ErrorKind::InvalidData(whence, offset).into())
        }
    }
}
