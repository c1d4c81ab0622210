use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use memmap::{Mmap, MmapOptions};

use dengbsp::errors::Result;

/// The bytes of a WAD, read from stdin or mapped from a file.
pub enum InputBuffer {
    Stdin(Vec<u8>),
    File(Mmap),
}

impl InputBuffer {
    /// Reads all of stdin into memory.
    pub fn new_from_stdin() -> Result<InputBuffer> {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;

        Ok(InputBuffer::Stdin(buf))
    }

    /// Maps a file into read-only memory.
    pub fn new_from_file<P>(path: P) -> Result<InputBuffer>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path)?;
        // The file is only ever read, and nothing else should be editing a
        // WAD while we chew on it
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        Ok(InputBuffer::File(mmap))
    }

    pub fn bytes(&self) -> &[u8] {
        match *self {
            InputBuffer::Stdin(ref v) => v,
            InputBuffer::File(ref m) => m,
        }
    }
}
