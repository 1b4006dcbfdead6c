use std::cmp;

use crate::device::{
    EofAware, Forward, Random, Reader, Result, Sequenced, Sizeable, Syncable,
    Truncatable, Writer, UNKNOWN_SIZE,
};

/// An unbounded source of zero bytes.
#[derive(Clone, Debug, Default)]
pub struct Zero {
    pos: u64,
}

impl Zero {
    pub fn new() -> Self {
        Zero { pos: 0 }
    }
}

impl Sequenced for Zero {
    fn offset(&self) -> Result<u64> {
        Ok(self.pos)
    }
}

impl Forward for Zero {
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        self.seek(offset)
    }
}

impl Random for Zero {
    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.pos = offset;
        Ok(offset)
    }
}

impl EofAware for Zero {
    fn is_eof(&self) -> Result<bool> {
        Ok(false)
    }
}

impl Sizeable for Zero {
    fn size(&self) -> Result<u64> {
        Ok(UNKNOWN_SIZE)
    }
}

impl Reader for Zero {
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]> {
        for b in buf.iter_mut() {
            *b = 0;
        }
        self.pos = self.pos.saturating_add(buf.len() as u64);
        Ok(buf)
    }
}

/// An unbounded source repeating a byte pattern.
///
/// The pattern is aligned to offset 0, so that bytes read are the same
/// regardless of how reads are chunked or where they start.
#[derive(Clone, Debug)]
pub struct Fill<'p> {
    pattern: &'p [u8],
    pos: u64,
}

impl<'p> Fill<'p> {
    /// New instance over `pattern`. This _panics_ if `pattern` is empty.
    pub fn new(pattern: &'p [u8]) -> Self {
        assert!(!pattern.is_empty(), "Fill pattern must not be empty");
        Fill { pattern, pos: 0 }
    }

    pub fn pattern(&self) -> &'p [u8] {
        self.pattern
    }
}

impl<'p> Sequenced for Fill<'p> {
    fn offset(&self) -> Result<u64> {
        Ok(self.pos)
    }
}

impl<'p> Forward for Fill<'p> {
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        self.seek(offset)
    }
}

impl<'p> Random for Fill<'p> {
    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.pos = offset;
        Ok(offset)
    }
}

impl<'p> EofAware for Fill<'p> {
    fn is_eof(&self) -> Result<bool> {
        Ok(false)
    }
}

impl<'p> Sizeable for Fill<'p> {
    fn size(&self) -> Result<u64> {
        Ok(UNKNOWN_SIZE)
    }
}

impl<'p> Reader for Fill<'p> {
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]> {
        let plen = self.pattern.len();
        // safe cast: remainder is less than plen which is already usize
        let phase = (self.pos % plen as u64) as usize;

        let head = cmp::min(plen - phase, buf.len());
        buf[..head].copy_from_slice(&self.pattern[phase..(phase + head)]);
        for chunk in buf[head..].chunks_mut(plen) {
            let n = chunk.len();
            chunk.copy_from_slice(&self.pattern[..n]);
        }

        self.pos = self.pos.saturating_add(buf.len() as u64);
        Ok(buf)
    }
}

/// A sink accepting and discarding all writes.
///
/// Position and size are tracked virtually: size is the furthest position
/// written or sought, unless reset by `truncate`.
#[derive(Clone, Debug, Default)]
pub struct Null {
    pos: u64,
    size: u64,
}

impl Null {
    pub fn new() -> Self {
        Null { pos: 0, size: 0 }
    }
}

impl Sequenced for Null {
    fn offset(&self) -> Result<u64> {
        Ok(self.pos)
    }
}

impl Forward for Null {
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        self.seek(offset)
    }
}

impl Random for Null {
    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.pos = offset;
        self.size = cmp::max(self.size, offset);
        Ok(offset)
    }
}

impl Sizeable for Null {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

impl Truncatable for Null {
    fn truncate(&mut self, size: u64) -> Result<u64> {
        self.pos = size;
        self.size = size;
        Ok(size)
    }
}

impl Syncable for Null {
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Writer for Null {
    fn write<'b>(&mut self, buf: &'b [u8]) -> Result<&'b [u8]> {
        self.pos = self.pos.saturating_add(buf.len() as u64);
        self.size = cmp::max(self.size, self.pos);
        Ok(&buf[buf.len()..])
    }
}

/// A source which is always empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct Empty;

impl Sequenced for Empty {
    fn offset(&self) -> Result<u64> {
        Ok(0)
    }
}

impl Forward for Empty {
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        self.seek(offset)
    }
}

impl Random for Empty {
    fn seek(&mut self, _offset: u64) -> Result<u64> {
        Ok(0)
    }
}

impl EofAware for Empty {
    fn is_eof(&self) -> Result<bool> {
        Ok(true)
    }
}

impl Sizeable for Empty {
    fn size(&self) -> Result<u64> {
        Ok(0)
    }
}

impl Reader for Empty {
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]> {
        Ok(&mut buf[..0])
    }
}
