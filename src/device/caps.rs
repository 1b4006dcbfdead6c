use std::any::Any;
use std::ops::{Deref, DerefMut};

use log::trace;

use crate::device::{DeviceError, OffsetRange, Result};

// Capabilities:
// [ Sequenced, Forward, Random ]
// [ Reader, EofAware, Sizeable, ReadMappable ]
// [ Writer, Syncable, Truncatable, WriteMappable ]
// [ Optionable ]

/// A device reporting its current position (cursor).
pub trait Sequenced {
    /// Return the current offset from the start of the device.
    fn offset(&self) -> Result<u64>;
}

/// A device which may move its cursor ahead.
///
/// Every `Random` device also implements this, typically as a plain `seek`.
pub trait Forward: Sequenced {
    /// Move the cursor to `offset`, which is expected to be at or beyond the
    /// current offset. Returns the new offset.
    fn seek_forward(&mut self, offset: u64) -> Result<u64>;
}

/// A device supporting absolute seeks.
pub trait Random: Forward {
    /// Move the cursor to `offset` and return the new offset. Seeking past
    /// the end is generally allowed, with reads there returning nothing.
    fn seek(&mut self, offset: u64) -> Result<u64>;
}

/// A device which can tell whether its cursor is at the end.
pub trait EofAware {
    fn is_eof(&self) -> Result<bool>;
}

/// A device with a (logical) size in bytes.
pub trait Sizeable {
    /// Return the size, or `UNKNOWN_SIZE` if the device is unbounded.
    fn size(&self) -> Result<u64>;
}

/// A device which can be resized.
pub trait Truncatable {
    /// Resize to exactly `size` bytes, returning the new size.
    fn truncate(&mut self, size: u64) -> Result<u64>;
}

/// A device which can flush to its persistent backing.
pub trait Syncable {
    fn sync(&mut self) -> Result<()>;
}

/// A device which can be read from its cursor.
pub trait Reader {
    /// Read bytes into `buf` from the cursor, advancing it, and return the
    /// filled prefix of `buf`. An empty result for a non-empty `buf` means
    /// end of device.
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]>;
}

/// A device which can be written at its cursor.
pub trait Writer {
    /// Write bytes of `buf` at the cursor, advancing it, and return the
    /// unwritten suffix of `buf`, empty when fully written.
    fn write<'b>(&mut self, buf: &'b [u8]) -> Result<&'b [u8]>;
}

/// A device offering read-only views of a range of its bytes.
pub trait ReadMappable {
    type View<'a>: Deref<Target = [u8]> where Self: 'a;

    /// Return a view of `range`. An unknown range end is resolved to the
    /// current device size.
    fn view_rd(&mut self, range: OffsetRange) -> Result<Self::View<'_>>;
}

/// A device offering writable views of a range of its bytes.
pub trait WriteMappable {
    type ViewMut<'a>: DerefMut<Target = [u8]> where Self: 'a;

    /// Return a writable view of `range`. Devices may grow to cover the
    /// range end.
    fn view_wr(&mut self, range: OffsetRange) -> Result<Self::ViewMut<'_>>;
}

/// A device with opaque options, identified by `device::opt` constants.
pub trait Optionable {
    fn getopt(&self, id: i32, query: &dyn Any) -> Result<Box<dyn Any>>;

    fn setopt(&mut self, id: i32, query: &dyn Any, input: &dyn Any)
        -> Result<Box<dyn Any>>;
}

pub fn read<'b, D>(device: &mut D, buf: &'b mut [u8]) -> Result<&'b mut [u8]>
    where D: Reader + ?Sized
{
    device.read(buf)
}

pub fn write<'b, D>(device: &mut D, buf: &'b [u8]) -> Result<&'b [u8]>
    where D: Writer + ?Sized
{
    device.write(buf)
}

pub fn offset<D: Sequenced + ?Sized>(device: &D) -> Result<u64> {
    device.offset()
}

pub fn seek<D: Random + ?Sized>(device: &mut D, offset: u64) -> Result<u64> {
    device.seek(offset)
}

pub fn seek_forward<D>(device: &mut D, offset: u64) -> Result<u64>
    where D: Forward + ?Sized
{
    device.seek_forward(offset)
}

pub fn is_eof<D: EofAware + ?Sized>(device: &D) -> Result<bool> {
    device.is_eof()
}

pub fn size<D: Sizeable + ?Sized>(device: &D) -> Result<u64> {
    device.size()
}

pub fn truncate<D>(device: &mut D, size: u64) -> Result<u64>
    where D: Truncatable + ?Sized
{
    device.truncate(size)
}

pub fn sync<D: Syncable + ?Sized>(device: &mut D) -> Result<()> {
    device.sync()
}

pub fn view_rd<D, R>(device: &mut D, range: R) -> Result<D::View<'_>>
    where D: ReadMappable + ?Sized, R: Into<OffsetRange>
{
    device.view_rd(range.into())
}

pub fn view_wr<D, R>(device: &mut D, range: R) -> Result<D::ViewMut<'_>>
    where D: WriteMappable + ?Sized, R: Into<OffsetRange>
{
    device.view_wr(range.into())
}

pub fn getopt<D>(device: &D, id: i32, query: &dyn Any) -> Result<Box<dyn Any>>
    where D: Optionable + ?Sized
{
    device.getopt(id, query)
}

pub fn setopt<D>(device: &mut D, id: i32, query: &dyn Any, input: &dyn Any)
    -> Result<Box<dyn Any>>
    where D: Optionable + ?Sized
{
    device.setopt(id, query, input)
}

/// Read repeatedly until `buf` is filled or the device reports end, and
/// return the filled prefix.
pub fn read_full<'b, D>(device: &mut D, buf: &'b mut [u8])
    -> Result<&'b mut [u8]>
    where D: Reader + ?Sized
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = device.read(&mut buf[filled..])?.len();
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(&mut buf[..filled])
}

/// Write repeatedly until all of `buf` is written. Fails with
/// `InvalidArgument` if the device stops accepting bytes.
pub fn write_all<D: Writer + ?Sized>(device: &mut D, buf: &[u8]) -> Result<()> {
    let mut rest = buf;
    while !rest.is_empty() {
        let remain = device.write(rest)?;
        if remain.len() == rest.len() {
            return Err(DeviceError::invalid_argument(
                "device accepted no bytes on write"
            ));
        }
        rest = remain;
    }
    Ok(())
}

/// Copy from `src` to `dst` in chunks of `chunk` bytes until `src` reports
/// end, returning the number of bytes copied. Never returns for unbounded
/// sources like `mem::Zero`.
pub fn copy<S, D>(src: &mut S, dst: &mut D, chunk: usize) -> Result<u64>
    where S: Reader + ?Sized, D: Writer + ?Sized
{
    assert!(chunk > 0, "copy chunk size must be non-zero");
    let mut buf = vec![0u8; chunk];
    let mut total = 0u64;
    loop {
        let got = src.read(&mut buf)?;
        if got.is_empty() {
            break;
        }
        write_all(dst, got)?;
        total += got.len() as u64;
    }
    trace!("copied {} bytes", total);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{opt, ErrorCode};
    use crate::mem::{Empty, Fill, MemoryDevice, Null, Zero};

    // Generic over minimal capability, run unchanged over several devices.
    fn sum_first<D: Reader + Random>(dev: &mut D, at: u64, n: usize) -> u64 {
        seek(dev, at).unwrap();
        let mut buf = vec![0u8; n];
        read_full(dev, &mut buf).unwrap().iter().map(|b| *b as u64).sum()
    }

    #[test]
    fn test_generic_dispatch() {
        let mut m = MemoryDevice::with_data(vec![1u8; 16]);
        assert_eq!(8, sum_first(&mut m, 8, 100));

        let mut z = Zero::new();
        assert_eq!(0, sum_first(&mut z, 8, 100));

        let mut f = Fill::new(&[2u8]);
        assert_eq!(200, sum_first(&mut f, 8, 100));

        let mut e = Empty;
        assert_eq!(0, sum_first(&mut e, 8, 100));
    }

    #[test]
    fn test_forward_is_seek() {
        let mut m = MemoryDevice::with_data(vec![0u8; 16]);
        assert_eq!(12, seek_forward(&mut m, 12).unwrap());
        assert_eq!(12, offset(&m).unwrap());
    }

    #[test]
    fn test_copy_mem_to_null() {
        let mut src = MemoryDevice::with_data((0..100u8).collect());
        let mut dst = Null::new();
        assert_eq!(100, copy(&mut src, &mut dst, 7).unwrap());
        assert_eq!(100, offset(&dst).unwrap());
        assert!(is_eof(&src).unwrap());
    }

    #[test]
    fn test_copy_mem_to_mem() {
        let data: Vec<u8> = (0..255u8).collect();
        let mut src = MemoryDevice::with_data(data.clone());
        let mut dst = MemoryDevice::new();
        copy(&mut src, &mut dst, 16).unwrap();
        assert_eq!(&data[..], &view_rd(&mut dst, 0..).unwrap()[..]);
    }

    #[test]
    fn test_options_dispatch() {
        let mut m = MemoryDevice::new();
        let cap = setopt(&mut m, opt::CAPACITY, &(), &64u64).unwrap();
        assert!(*cap.downcast::<u64>().unwrap() >= 64);
        let e = getopt(&m, 99, &()).unwrap_err();
        assert_eq!(ErrorCode::NotSupported, e.code());
    }
}
