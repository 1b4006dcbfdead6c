use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::device::{
    EofAware, Forward, Random, Reader, Result, Sequenced, Sizeable, Syncable,
    Truncatable, Writer,
};

// `File` has a single, OS maintained cursor. Queries go through the `&File`
// implementations of `Seek` so that they need not borrow mutably.

impl Sequenced for File {
    fn offset(&self) -> Result<u64> {
        let mut f: &File = self;
        Ok(f.stream_position()?)
    }
}

impl Forward for File {
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        Random::seek(self, offset)
    }
}

impl Random for File {
    fn seek(&mut self, offset: u64) -> Result<u64> {
        Ok(Seek::seek(self, SeekFrom::Start(offset))?)
    }
}

impl EofAware for File {
    fn is_eof(&self) -> Result<bool> {
        Ok(self.offset()? >= self.size()?)
    }
}

impl Sizeable for File {
    fn size(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl Truncatable for File {
    fn truncate(&mut self, size: u64) -> Result<u64> {
        self.set_len(size)?;
        Ok(size)
    }
}

impl Syncable for File {
    fn sync(&mut self) -> Result<()> {
        Ok(self.sync_all()?)
    }
}

impl Reader for File {
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]> {
        let n = Read::read(self, buf)?;
        Ok(&mut buf[..n])
    }
}

impl Writer for File {
    fn write<'b>(&mut self, buf: &'b [u8]) -> Result<&'b [u8]> {
        let n = Write::write(self, buf)?;
        Ok(&buf[n..])
    }
}
