use std::any::Any;
use std::borrow::{Borrow, BorrowMut};
use std::marker::PhantomData;

use crate::device::{
    DeviceError, EofAware, Forward, OffsetRange, Optionable, Random,
    ReadMappable, Reader, Result, Sequenced, Sizeable, Syncable, Truncatable,
    WriteMappable, Writer, UNKNOWN_SIZE,
};

/// Presents a `Random` device with its offsets shifted down by a fixed
/// amount, so that offset 0 is the device's offset `shift`.
///
/// Unlike `Sub`, the tail of the device is not capped: reads and writes
/// extend as far as the device allows, and end where it reports end.
/// Offsets and sizes of a device cursor still before `shift` are reported
/// as 0.
#[derive(Debug)]
pub struct Shift<D, B>
where D: Random, B: BorrowMut<D>
{
    shift: u64,
    device: B,
    phantom: PhantomData<fn() -> D>
}

impl<D, B> Shift<D, B>
where D: Random, B: BorrowMut<D>
{
    pub fn new(device: B, shift: u64) -> Self {
        Shift { shift, device, phantom: PhantomData }
    }

    pub fn shift(&self) -> u64 {
        self.shift
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

    fn shifted(&self, offset: u64) -> Result<u64> {
        offset.checked_add(self.shift)
            .ok_or_else(|| DeviceError::value_too_large("shifted offset"))
    }

    // Move the device cursor up to `shift` if it is still before it.
    fn skip_head(&mut self) -> Result<()> {
        let shift = self.shift;
        let dev = self.device.borrow_mut();
        if dev.offset()? < shift {
            dev.seek_forward(shift)?;
        }
        Ok(())
    }

    fn shifted_range(&self, range: OffsetRange) -> Result<OffsetRange> {
        assert!(range.is_valid(), "malformed range {:?}", range);
        range.translate(self.shift)
    }
}

impl<D, B> Sequenced for Shift<D, B>
where D: Random, B: BorrowMut<D>
{
    fn offset(&self) -> Result<u64> {
        let off = self.device.borrow().offset()?;
        Ok(off.saturating_sub(self.shift))
    }
}

impl<D, B> Forward for Shift<D, B>
where D: Random, B: BorrowMut<D>
{
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        let abspos = self.shifted(offset)?;
        let p = self.device.borrow_mut().seek_forward(abspos)?;
        Ok(p.saturating_sub(self.shift))
    }
}

impl<D, B> Random for Shift<D, B>
where D: Random, B: BorrowMut<D>
{
    fn seek(&mut self, offset: u64) -> Result<u64> {
        let abspos = self.shifted(offset)?;
        let p = self.device.borrow_mut().seek(abspos)?;
        Ok(p.saturating_sub(self.shift))
    }
}

impl<D, B> Sizeable for Shift<D, B>
where D: Random + Sizeable, B: BorrowMut<D>
{
    fn size(&self) -> Result<u64> {
        let s = self.device.borrow().size()?;
        if s == UNKNOWN_SIZE {
            Ok(UNKNOWN_SIZE)
        } else {
            Ok(s.saturating_sub(self.shift))
        }
    }
}

impl<D, B> EofAware for Shift<D, B>
where D: Random + EofAware, B: BorrowMut<D>
{
    fn is_eof(&self) -> Result<bool> {
        self.device.borrow().is_eof()
    }
}

impl<D, B> Reader for Shift<D, B>
where D: Random + Reader, B: BorrowMut<D>
{
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]> {
        self.skip_head()?;
        self.device.borrow_mut().read(buf)
    }
}

impl<D, B> Writer for Shift<D, B>
where D: Random + Writer, B: BorrowMut<D>
{
    fn write<'b>(&mut self, buf: &'b [u8]) -> Result<&'b [u8]> {
        self.skip_head()?;
        self.device.borrow_mut().write(buf)
    }
}

impl<D, B> ReadMappable for Shift<D, B>
where D: Random + ReadMappable, B: BorrowMut<D>
{
    type View<'a> = D::View<'a> where Self: 'a;

    fn view_rd(&mut self, range: OffsetRange) -> Result<Self::View<'_>> {
        let abs = self.shifted_range(range)?;
        self.device.borrow_mut().view_rd(abs)
    }
}

impl<D, B> WriteMappable for Shift<D, B>
where D: Random + WriteMappable, B: BorrowMut<D>
{
    type ViewMut<'a> = D::ViewMut<'a> where Self: 'a;

    fn view_wr(&mut self, range: OffsetRange) -> Result<Self::ViewMut<'_>> {
        let abs = self.shifted_range(range)?;
        self.device.borrow_mut().view_wr(abs)
    }
}

impl<D, B> Truncatable for Shift<D, B>
where D: Random + Truncatable, B: BorrowMut<D>
{
    fn truncate(&mut self, size: u64) -> Result<u64> {
        let abs = self.shifted(size)?;
        let s = self.device.borrow_mut().truncate(abs)?;
        Ok(s.saturating_sub(self.shift))
    }
}

impl<D, B> Syncable for Shift<D, B>
where D: Random + Syncable, B: BorrowMut<D>
{
    fn sync(&mut self) -> Result<()> {
        self.device.borrow_mut().sync()
    }
}

impl<D, B> Optionable for Shift<D, B>
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
