use std::borrow::{Borrow, BorrowMut};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use log::{debug, warn};

use crate::device::{
    read_full, to_usize, write_all, DeviceError, EofAware, Forward,
    OffsetRange, Random, ReadMappable, Reader, Result, Sequenced, Sizeable,
    WriteMappable, Writer,
};

// Allocate a zeroed buffer for a bounded `range`.
pub(super) fn range_buffer(range: &OffsetRange) -> Result<Vec<u8>> {
    assert!(range.is_valid(), "malformed range {:?}", range);
    let len = range.len()
        .ok_or_else(|| DeviceError::invalid_argument("unbounded view range"))?;
    let len = to_usize(len)?;
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        debug!("view buffer of {} bytes: {}", len, e);
        DeviceError::not_enough_memory("view buffer")
    })?;
    data.resize(len, 0);
    Ok(data)
}

/// An owned, read-only copy of bytes read from a device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CachedView {
    data: Vec<u8>,
}

impl CachedView {
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for CachedView {
    fn from(data: Vec<u8>) -> Self {
        CachedView { data }
    }
}

impl Deref for CachedView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

/// Offers `ReadMappable` views over a plain `Reader`, by reading each
/// requested range into a buffer.
///
/// A plain reader cannot seek, so a view of length _n_ holds the next _n_
/// bytes from the device's current position, or fewer at end of device,
/// and advances the device. Only the length of the range is significant
/// and unbounded ranges fail with `InvalidArgument`.
#[derive(Debug)]
pub struct ViewReader<D, B>
where D: Reader, B: BorrowMut<D>
{
    device: B,
    phantom: PhantomData<fn() -> D>
}

impl<D, B> ViewReader<D, B>
where D: Reader, B: BorrowMut<D>
{
    pub fn new(device: B) -> Self {
        ViewReader { device, phantom: PhantomData }
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
}

impl<D, B> ReadMappable for ViewReader<D, B>
where D: Reader, B: BorrowMut<D>
{
    type View<'a> = CachedView where Self: 'a;

    fn view_rd(&mut self, range: OffsetRange) -> Result<CachedView> {
        let mut data = range_buffer(&range)?;
        let n = read_full(self.device.borrow_mut(), &mut data)?.len();
        data.truncate(n);
        Ok(CachedView { data })
    }
}

impl<D, B> Reader for ViewReader<D, B>
where D: Reader, B: BorrowMut<D>
{
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]> {
        self.device.borrow_mut().read(buf)
    }
}

impl<D, B> Sequenced for ViewReader<D, B>
where D: Reader + Sequenced, B: BorrowMut<D>
{
    fn offset(&self) -> Result<u64> {
        self.device.borrow().offset()
    }
}

impl<D, B> EofAware for ViewReader<D, B>
where D: Reader + EofAware, B: BorrowMut<D>
{
    fn is_eof(&self) -> Result<bool> {
        self.device.borrow().is_eof()
    }
}

impl<D, B> Sizeable for ViewReader<D, B>
where D: Reader + Sizeable, B: BorrowMut<D>
{
    fn size(&self) -> Result<u64> {
        self.device.borrow().size()
    }
}

/// Offers `WriteMappable` views over a `Writer`, buffering the requested
/// range and writing it back at the range start when the view is
/// committed or dropped.
///
/// Views start zero filled, since the device is not read. The inner
/// device must not be otherwise used while a view is held, which the
/// borrow of the `ViewWriter` enforces.
#[derive(Debug)]
pub struct ViewWriter<D, B>
where D: Writer + Random, B: BorrowMut<D>
{
    device: B,
    phantom: PhantomData<fn() -> D>
}

impl<D, B> ViewWriter<D, B>
where D: Writer + Random, B: BorrowMut<D>
{
    pub fn new(device: B) -> Self {
        ViewWriter { device, phantom: PhantomData }
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
}

impl<D, B> WriteMappable for ViewWriter<D, B>
where D: Writer + Random, B: BorrowMut<D>
{
    type ViewMut<'a> = WriteBack<'a, D> where Self: 'a;

    fn view_wr(&mut self, range: OffsetRange) -> Result<WriteBack<'_, D>> {
        let data = range_buffer(&range)?;
        Ok(WriteBack {
            device: self.device.borrow_mut(),
            data,
            pos: range.start(),
            committed: false,
        })
    }
}

impl<D, B> Writer for ViewWriter<D, B>
where D: Writer + Random, B: BorrowMut<D>
{
    fn write<'b>(&mut self, buf: &'b [u8]) -> Result<&'b [u8]> {
        self.device.borrow_mut().write(buf)
    }
}

impl<D, B> Sequenced for ViewWriter<D, B>
where D: Writer + Random, B: BorrowMut<D>
{
    fn offset(&self) -> Result<u64> {
        self.device.borrow().offset()
    }
}

impl<D, B> Forward for ViewWriter<D, B>
where D: Writer + Random, B: BorrowMut<D>
{
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        self.device.borrow_mut().seek_forward(offset)
    }
}

impl<D, B> Random for ViewWriter<D, B>
where D: Writer + Random, B: BorrowMut<D>
{
    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.device.borrow_mut().seek(offset)
    }
}

/// A writable buffer which is written back to its device at a fixed
/// offset exactly once: on `commit`, or else when dropped.
///
/// Errors on drop can only be logged. Use `commit` to observe them.
pub struct WriteBack<'a, D>
where D: Writer + Random
{
    device: &'a mut D,
    data: Vec<u8>,
    pos: u64,
    committed: bool,
}

impl<'a, D> WriteBack<'a, D>
where D: Writer + Random
{
    /// The device offset where the buffer will be written.
    pub fn offset(&self) -> u64 {
        self.pos
    }

    /// Write the buffer back now, consuming the view.
    pub fn commit(mut self) -> Result<()> {
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.committed = true;
        self.device.seek(self.pos)?;
        write_all(&mut *self.device, &self.data)
    }
}

impl<'a, D> Deref for WriteBack<'a, D>
where D: Writer + Random
{
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl<'a, D> DerefMut for WriteBack<'a, D>
where D: Writer + Random
{
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl<'a, D> Drop for WriteBack<'a, D>
where D: Writer + Random
{
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = self.flush() {
                warn!("write-back of {} bytes at {} failed: {}",
                      self.data.len(), self.pos, e);
            }
        }
    }
}
