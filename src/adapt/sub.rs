use std::any::Any;
use std::borrow::{Borrow, BorrowMut};
use std::cmp;
use std::marker::PhantomData;

use log::trace;

use crate::device::{
    to_usize, DeviceError, EofAware, Forward, OffsetRange, Optionable,
    Random, ReadMappable, Reader, Result, Sequenced, Sizeable, Syncable,
    Truncatable, WriteMappable, Writer, UNKNOWN_SIZE,
};

/// Presents a fixed section of a `Random` device as an independent device,
/// addressed from 0.
///
/// The type is generic over the device and a `BorrowMut` type, so it can be
/// an owner via `Sub<MemoryDevice, MemoryDevice>` or use a mutable
/// reference, as in `Sub<MemoryDevice, &mut MemoryDevice>`.
///
/// Fixed `begin` and `end` offsets of the section are passed on
/// construction and used to constrain reads, writes and views, and to
/// translate seeks, so a `seek(0)` is always to the first byte of the
/// section. The end may be unknown, in which case the section extends to the
/// end of the device. Reads and writes at or beyond `end` return nothing
/// read or written. Seeking past the end is allowed. The section can't be
/// resized by `truncate`.
#[derive(Debug)]
pub struct Sub<D, B>
where D: Random, B: BorrowMut<D>
{
    section: OffsetRange,
    device: B,
    phantom: PhantomData<fn() -> D>
}

impl<D, B> Sub<D, B>
where D: Random, B: BorrowMut<D>
{
    /// New instance by device and section. This _panics_ if the section is
    /// malformed, e.g. its begin is greater than its end.
    pub fn new(device: B, section: OffsetRange) -> Self {
        assert!(section.is_valid(), "malformed section {:?}", section);
        Sub { section, device, phantom: PhantomData }
    }

    /// New instance over the whole device, `[0, unknown)`.
    pub fn whole(device: B) -> Self {
        Sub::new(device, OffsetRange::whole())
    }

    pub fn section(&self) -> OffsetRange {
        self.section
    }

    pub fn underlying(&self) -> &D {
        self.device.borrow()
    }

    pub fn underlying_mut(&mut self) -> &mut D {
        self.device.borrow_mut()
    }

    pub fn into_inner(self) -> B {
        self.device
    }

    fn begin(&self) -> u64 {
        self.section.start()
    }

    fn end(&self) -> u64 {
        self.section.stop()
    }

    // Absolute device offset of relative `offset`.
    fn absolute(&self, offset: u64) -> Result<u64> {
        self.begin().checked_add(offset)
            .filter(|p| *p < UNKNOWN_SIZE)
            .ok_or_else(|| DeviceError::value_too_large("seek beyond u64"))
    }

    /// Position the device cursor within the section, returning the number
    /// of bytes available to read or write there, 0 at or beyond end.
    fn available(&mut self) -> Result<u64> {
        let begin = self.begin();
        let end = self.end();
        let dev = self.device.borrow_mut();
        let mut off = dev.offset()?;
        if off < begin {
            off = dev.seek_forward(begin)?;
        }
        if off >= end {
            Ok(0)
        } else {
            Ok(end - off)
        }
    }

    /// Translate a relative view range to absolute, clamped to the section.
    fn absolute_range(&self, range: OffsetRange) -> Result<OffsetRange> {
        assert!(range.is_valid(), "malformed range {:?}", range);
        let mut abs = range.translate(self.begin())?;
        if self.section.is_bounded() && (!abs.is_bounded() ||
                                         abs.end > self.section.end)
        {
            abs.end = self.section.end;
        }
        if abs.is_bounded() && abs.begin > abs.end {
            return Err(DeviceError::invalid_argument(
                "range begins beyond section end"
            ));
        }
        Ok(abs)
    }
}

impl<D, B> Sequenced for Sub<D, B>
where D: Random, B: BorrowMut<D>
{
    fn offset(&self) -> Result<u64> {
        let off = self.device.borrow().offset()?;
        let off = cmp::min(cmp::max(off, self.begin()), self.end());
        Ok(off - self.begin())
    }
}

impl<D, B> Forward for Sub<D, B>
where D: Random, B: BorrowMut<D>
{
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        let abspos = self.absolute(offset)?;
        let p = self.device.borrow_mut().seek_forward(abspos)?;
        Ok(p.saturating_sub(self.begin()))
    }
}

impl<D, B> Random for Sub<D, B>
where D: Random, B: BorrowMut<D>
{
    /// Seek to an offset relative to the section begin.
    fn seek(&mut self, offset: u64) -> Result<u64> {
        let abspos = self.absolute(offset)?;
        let p = self.device.borrow_mut().seek(abspos)?;
        Ok(p.saturating_sub(self.begin()))
    }
}

impl<D, B> Sizeable for Sub<D, B>
where D: Random + Sizeable, B: BorrowMut<D>
{
    /// Return the section size. For an unknown section end this is the
    /// remainder of the device beyond begin.
    fn size(&self) -> Result<u64> {
        if let Some(len) = self.section.len() {
            return Ok(len);
        }
        let dsize = self.device.borrow().size()?;
        if dsize == UNKNOWN_SIZE {
            Ok(UNKNOWN_SIZE)
        } else {
            Ok(dsize.saturating_sub(self.begin()))
        }
    }
}

impl<D, B> EofAware for Sub<D, B>
where D: Random + EofAware, B: BorrowMut<D>
{
    /// For a bounded section, whether the offset has reached its length.
    /// Otherwise the section ends with the device, so the device answers.
    fn is_eof(&self) -> Result<bool> {
        match self.section.len() {
            Some(len) => Ok(self.offset()? >= len),
            None => self.device.borrow().is_eof(),
        }
    }
}

impl<D, B> Reader for Sub<D, B>
where D: Random + Reader, B: BorrowMut<D>
{
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]> {
        let avail = self.available()?;
        if avail == 0 {
            return Ok(&mut buf[..0]);
        }
        if (buf.len() as u64) <= avail {
            self.device.borrow_mut().read(buf)
        } else {
            // safe cast: avail < buf.len which is already usize
            trace!("sub read clamped {} -> {}", buf.len(), avail);
            self.device.borrow_mut().read(&mut buf[..(avail as usize)])
        }
    }
}

impl<D, B> Writer for Sub<D, B>
where D: Random + Writer, B: BorrowMut<D>
{
    fn write<'b>(&mut self, buf: &'b [u8]) -> Result<&'b [u8]> {
        let avail = self.available()?;
        if avail == 0 {
            return Ok(buf);
        }
        // safe cast: min with buf.len which is already usize
        let n = cmp::min(avail, buf.len() as u64) as usize;
        let rem = self.device.borrow_mut().write(&buf[..n])?;
        let written = n - rem.len();
        Ok(&buf[written..])
    }
}

impl<D, B> ReadMappable for Sub<D, B>
where D: Random + ReadMappable, B: BorrowMut<D>
{
    type View<'a> = D::View<'a> where Self: 'a;

    fn view_rd(&mut self, range: OffsetRange) -> Result<Self::View<'_>> {
        let abs = self.absolute_range(range)?;
        self.device.borrow_mut().view_rd(abs)
    }
}

impl<D, B> WriteMappable for Sub<D, B>
where D: Random + WriteMappable, B: BorrowMut<D>
{
    type ViewMut<'a> = D::ViewMut<'a> where Self: 'a;

    fn view_wr(&mut self, range: OffsetRange) -> Result<Self::ViewMut<'_>> {
        let abs = self.absolute_range(range)?;
        self.device.borrow_mut().view_wr(abs)
    }
}

impl<D, B> Truncatable for Sub<D, B>
where D: Random + Sizeable, B: BorrowMut<D>
{
    /// Succeeds, without effect, only if `size` is the current section
    /// size. A section can't resize its device.
    fn truncate(&mut self, size: u64) -> Result<u64> {
        let cur = self.size()?;
        if size != cur {
            return Err(DeviceError::invalid_argument(
                "section size is fixed"
            ));
        }
        Ok(cur)
    }
}

impl<D, B> Syncable for Sub<D, B>
where D: Random + Syncable, B: BorrowMut<D>
{
    fn sync(&mut self) -> Result<()> {
        self.device.borrow_mut().sync()
    }
}

impl<D, B> Optionable for Sub<D, B>
where D: Random + Optionable, B: BorrowMut<D>
{
    fn getopt(&self, id: i32, query: &dyn Any) -> Result<Box<dyn Any>> {
        self.device.borrow().getopt(id, query)
    }

    fn setopt(&mut self, id: i32, query: &dyn Any, input: &dyn Any)
        -> Result<Box<dyn Any>>
    {
        self.device.borrow_mut().setopt(id, query, input)
    }
}

impl<D, B> Sub<D, B>
where D: Random + Reader, B: BorrowMut<D>
{
    /// Read the remainder of the section into a new `Vec`.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>>
        where D: Sizeable
    {
        let len = to_usize(self.size()?.saturating_sub(self.offset()?))?;
        let mut out = vec![0u8; len];
        let n = crate::device::read_full(self, &mut out)?.len();
        out.truncate(n);
        Ok(out)
    }
}
