//! Buffered backend: seek, then read until the buffer is full or the file
//! ends.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::{FileClass, WadFile};

/// A WAD file read through `std::fs::File`.
#[derive(Debug)]
pub struct StdcFile {
    file: File,
    length: u64,
}

impl StdcFile {
    /// Opens `path` for reading.
    ///
    /// # Errors
    ///
    /// Any I/O error from opening the file or reading its metadata.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self { file, length })
    }
}

impl WadFile for StdcFile {
    fn class(&self) -> FileClass {
        FileClass::Stdc
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}
