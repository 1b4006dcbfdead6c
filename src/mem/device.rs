use std::any::Any;
use std::cmp;

use crate::device::{
    opt, to_usize, DeviceError, EofAware, Forward, OffsetRange, Optionable,
    Random, ReadMappable, Reader, Result, Sequenced, Sizeable, Syncable,
    Truncatable, WriteMappable, Writer,
};
use crate::mem::{Represent, RepresentMut, VecRepr};

/// A random access device over in-memory storage.
///
/// The storage is a `Represent`: by default an owned `VecRepr`, or
/// externally owned storage and position via `RefRepr`, `SliceRepr`,
/// `ConstRepr`, or shared `BytesRepr`. Read-side capabilities are available
/// for any representation, write-side ones only for `RepresentMut`.
///
/// Seeking past the end is allowed, and reads there return nothing. Writes
/// and writable views beyond the end grow the storage first, when the
/// representation supports it, and otherwise fail with `NotSupported`.
/// Storage never shrinks except by explicit `truncate`.
#[derive(Clone, Debug, Default)]
pub struct MemoryDevice<R = VecRepr>
where R: Represent
{
    rep: R,
}

impl MemoryDevice<VecRepr> {
    /// New, empty device with owned storage.
    pub fn new() -> Self {
        MemoryDevice { rep: VecRepr::default() }
    }

    /// New device owning `data`, positioned at its start.
    pub fn with_data(data: Vec<u8>) -> Self {
        MemoryDevice { rep: VecRepr::new(data) }
    }

    /// Return the owned storage.
    pub fn into_vec(self) -> Vec<u8> {
        self.rep.into_vec()
    }
}

impl<R> MemoryDevice<R>
where R: Represent
{
    pub fn from_repr(rep: R) -> Self {
        MemoryDevice { rep }
    }

    pub fn underlying(&self) -> &R {
        &self.rep
    }

    pub fn underlying_mut(&mut self) -> &mut R {
        &mut self.rep
    }

    pub fn into_inner(self) -> R {
        self.rep
    }

    /// Resolve and bounds check `range` against the current size, as
    /// `usize` begin and end.
    fn checked_range(&self, range: OffsetRange) -> Result<(usize, usize)> {
        assert!(range.is_valid(), "malformed range {:?}", range);
        let len = self.rep.data().len() as u64;
        let range = range.resolve(len);
        if range.stop() > len || range.start() > range.stop() {
            return Err(DeviceError::invalid_argument("range beyond end"));
        }
        Ok((to_usize(range.start())?, to_usize(range.stop())?))
    }
}

impl<R> MemoryDevice<R>
where R: RepresentMut
{
    // Grow storage to at least `len` bytes.
    fn ensure_len(&mut self, len: usize) -> Result<()> {
        if self.rep.data().len() < len {
            self.rep.resize(len)?;
        }
        Ok(())
    }
}

impl<R: Represent> Sequenced for MemoryDevice<R> {
    fn offset(&self) -> Result<u64> {
        Ok(self.rep.pos() as u64)
    }
}

impl<R: Represent> Forward for MemoryDevice<R> {
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        self.seek(offset)
    }
}

impl<R: Represent> Random for MemoryDevice<R> {
    fn seek(&mut self, offset: u64) -> Result<u64> {
        let pos = to_usize(offset)?;
        self.rep.set_pos(pos);
        Ok(offset)
    }
}

impl<R: Represent> EofAware for MemoryDevice<R> {
    fn is_eof(&self) -> Result<bool> {
        Ok(self.rep.pos() >= self.rep.data().len())
    }
}

impl<R: Represent> Sizeable for MemoryDevice<R> {
    fn size(&self) -> Result<u64> {
        Ok(self.rep.data().len() as u64)
    }
}

impl<R: Represent> Reader for MemoryDevice<R> {
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]> {
        let pos = self.rep.pos();
        let data = self.rep.data();
        if pos >= data.len() || buf.is_empty() {
            return Ok(&mut buf[..0]);
        }
        let n = cmp::min(data.len() - pos, buf.len());
        buf[..n].copy_from_slice(&data[pos..(pos + n)]);
        self.rep.set_pos(pos + n);
        Ok(&mut buf[..n])
    }
}

impl<R: Represent> ReadMappable for MemoryDevice<R> {
    type View<'a> = &'a [u8] where Self: 'a;

    fn view_rd(&mut self, range: OffsetRange) -> Result<Self::View<'_>> {
        let (begin, end) = self.checked_range(range)?;
        Ok(&self.rep.data()[begin..end])
    }
}

impl<R: RepresentMut> Writer for MemoryDevice<R> {
    fn write<'b>(&mut self, buf: &'b [u8]) -> Result<&'b [u8]> {
        if buf.is_empty() {
            return Ok(buf);
        }
        let pos = self.rep.pos();
        let new_pos = pos.checked_add(buf.len())
            .ok_or_else(|| DeviceError::value_too_large("write end"))?;
        self.ensure_len(new_pos)?;
        self.rep.data_mut()[pos..new_pos].copy_from_slice(buf);
        self.rep.set_pos(new_pos);
        Ok(&buf[buf.len()..])
    }
}

impl<R: RepresentMut> WriteMappable for MemoryDevice<R> {
    type ViewMut<'a> = &'a mut [u8] where Self: 'a;

    fn view_wr(&mut self, range: OffsetRange)
        -> Result<Self::ViewMut<'_>>
    {
        assert!(range.is_valid(), "malformed range {:?}", range);
        let range = range.resolve(self.rep.data().len() as u64);
        if range.start() > range.stop() {
            return Err(DeviceError::invalid_argument("range begins beyond end"));
        }
        let begin = to_usize(range.start())?;
        let end = to_usize(range.stop())?;
        self.ensure_len(end)?;
        Ok(&mut self.rep.data_mut()[begin..end])
    }
}

impl<R: RepresentMut> Truncatable for MemoryDevice<R> {
    fn truncate(&mut self, size: u64) -> Result<u64> {
        let len = to_usize(size)?;
        self.rep.resize(len)?;
        Ok(size)
    }
}

impl<R: RepresentMut> Syncable for MemoryDevice<R> {
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<R: Represent> Optionable for MemoryDevice<R> {
    fn getopt(&self, id: i32, _query: &dyn Any) -> Result<Box<dyn Any>> {
        match id {
            opt::CAPACITY => Ok(Box::new(self.rep.capacity() as u64)),
            _ => Err(DeviceError::not_supported("unknown option")),
        }
    }

    fn setopt(&mut self, id: i32, _query: &dyn Any, input: &dyn Any)
        -> Result<Box<dyn Any>>
    {
        match id {
            opt::CAPACITY => {
                let cap = input.downcast_ref::<u64>()
                    .ok_or_else(|| DeviceError::invalid_argument(
                        "capacity option requires u64"
                    ))?;
                self.rep.reserve(to_usize(*cap)?)?;
                Ok(Box::new(self.rep.capacity() as u64))
            }
            _ => Err(DeviceError::not_supported("unknown option")),
        }
    }
}
