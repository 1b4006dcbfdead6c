use std::any::Any;
use std::borrow::Borrow;
use std::cell::{Ref, RefCell, RefMut};
use std::marker::PhantomData;

use log::trace;

use crate::adapt::view::{range_buffer, CachedView};
use crate::device::{
    read_full, DeviceError, EofAware, Forward, OffsetRange, Optionable,
    Random, ReadMappable, Reader, Result, Sequenced, Sizeable, Syncable,
    Truncatable, Writer,
};

/// Re-implements the device capabilities of a single-cursor `Random`
/// device while maintaining an instance independent position.
///
/// The type is generic over the device and a `Borrow` of its `RefCell`, so
/// for example it can share a reference, as in
/// `Multiplex<MemoryDevice, &RefCell<MemoryDevice>>`, or a counted owner,
/// as in `Multiplex<MemoryDevice, Rc<RefCell<MemoryDevice>>>`. Any number of
/// instances may then share the same device, each behaving as an
/// independently seekable stream.
///
/// Every cursor-dependent operation seeks the shared device to this
/// instance's position, performs the operation, and then records the
/// device's resulting position. The user is advised to avoid direct
/// operations on the shared device while instances are in use. A shared
/// device which is already borrowed, for example by a nested operation,
/// results in a `ResourceBusy` error.
///
/// Read views are owned copies of the requested range, read while the
/// shared device is borrowed, and don't move this instance's position. A
/// view borrowing the device storage would outlive that borrow. Writable
/// views are not offered: wrap with `ViewWriter` for write-back views.
#[derive(Debug)]
pub struct Multiplex<D, B>
where D: Random, B: Borrow<RefCell<D>>
{
    pos: u64,
    device: B,
    phantom: PhantomData<fn() -> D>
}

impl<D, B> Multiplex<D, B>
where D: Random, B: Borrow<RefCell<D>>
{
    /// New instance by shared device reference. The initial position is
    /// the start of the device.
    pub fn new(device: B) -> Self {
        Multiplex::with_offset(device, 0)
    }

    /// New instance with the given initial position.
    pub fn with_offset(device: B, pos: u64) -> Self {
        Multiplex { pos, device, phantom: PhantomData }
    }

    /// Return the current instance position. This is infallible and does
    /// not touch the shared device.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    pub fn underlying(&self) -> &RefCell<D> {
        self.device.borrow()
    }

    pub fn into_inner(self) -> B {
        self.device
    }

    fn shared(&self) -> Result<Ref<'_, D>> {
        self.device.borrow().try_borrow()
            .map_err(|_| DeviceError::busy("multiplexed device in use"))
    }

    fn shared_mut(&self) -> Result<RefMut<'_, D>> {
        self.device.borrow().try_borrow_mut()
            .map_err(|_| DeviceError::busy("multiplexed device in use"))
    }

    /// Perform `op` on the shared device positioned at this instance's
    /// offset, then record the resulting offset, even if `op` fails.
    fn tracked<T, F>(&mut self, op: F) -> Result<T>
        where F: FnOnce(&mut D) -> Result<T>
    {
        let mut dev = self.device.borrow().try_borrow_mut()
            .map_err(|_| DeviceError::busy("multiplexed device in use"))?;
        dev.seek(self.pos)?;
        let res = op(&mut *dev);
        match dev.offset() {
            Ok(p) => {
                trace!("multiplex cursor {} -> {}", self.pos, p);
                self.pos = p;
            }
            Err(e) => {
                if res.is_ok() {
                    return Err(e);
                }
            }
        }
        res
    }
}

impl<D, B> Clone for Multiplex<D, B>
where D: Random, B: Borrow<RefCell<D>> + Clone
{
    /// Return a new, independent `Multiplex` over the same device, with
    /// position 0 (ignores the current position of self).
    fn clone(&self) -> Self {
        Multiplex::new(self.device.clone())
    }
}

impl<D, B> Sequenced for Multiplex<D, B>
where D: Random, B: Borrow<RefCell<D>>
{
    fn offset(&self) -> Result<u64> {
        Ok(self.pos)
    }
}

impl<D, B> Forward for Multiplex<D, B>
where D: Random, B: Borrow<RefCell<D>>
{
    fn seek_forward(&mut self, offset: u64) -> Result<u64> {
        self.tracked(|d| d.seek_forward(offset))
    }
}

impl<D, B> Random for Multiplex<D, B>
where D: Random, B: Borrow<RefCell<D>>
{
    fn seek(&mut self, offset: u64) -> Result<u64> {
        self.tracked(|d| d.seek(offset))
    }
}

impl<D, B> EofAware for Multiplex<D, B>
where D: Random + EofAware, B: Borrow<RefCell<D>>
{
    fn is_eof(&self) -> Result<bool> {
        let mut dev = self.shared_mut()?;
        dev.seek(self.pos)?;
        dev.is_eof()
    }
}

impl<D, B> Sizeable for Multiplex<D, B>
where D: Random + Sizeable, B: Borrow<RefCell<D>>
{
    fn size(&self) -> Result<u64> {
        self.shared()?.size()
    }
}

impl<D, B> Reader for Multiplex<D, B>
where D: Random + Reader, B: Borrow<RefCell<D>>
{
    fn read<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b mut [u8]> {
        self.tracked(move |d| d.read(buf))
    }
}

impl<D, B> ReadMappable for Multiplex<D, B>
where D: Random + Reader + Sizeable, B: Borrow<RefCell<D>>
{
    type View<'a> = CachedView where Self: 'a;

    fn view_rd(&mut self, range: OffsetRange) -> Result<CachedView> {
        assert!(range.is_valid(), "malformed range {:?}", range);
        let mut dev = self.shared_mut()?;
        let size = dev.size()?;
        let range = range.resolve(size);
        if range.is_bounded() && range.stop() > size {
            return Err(DeviceError::invalid_argument("range beyond end"));
        }
        let mut data = range_buffer(&range)?;
        dev.seek(range.start())?;
        let n = read_full(&mut *dev, &mut data)?.len();
        data.truncate(n);
        Ok(CachedView::from(data))
    }
}

impl<D, B> Writer for Multiplex<D, B>
where D: Random + Writer, B: Borrow<RefCell<D>>
{
    fn write<'b>(&mut self, buf: &'b [u8]) -> Result<&'b [u8]> {
        self.tracked(move |d| d.write(buf))
    }
}

impl<D, B> Truncatable for Multiplex<D, B>
where D: Random + Truncatable, B: Borrow<RefCell<D>>
{
    fn truncate(&mut self, size: u64) -> Result<u64> {
        self.tracked(|d| d.truncate(size))
    }
}

impl<D, B> Syncable for Multiplex<D, B>
where D: Random + Syncable, B: Borrow<RefCell<D>>
{
    fn sync(&mut self) -> Result<()> {
        self.shared_mut()?.sync()
    }
}

impl<D, B> Optionable for Multiplex<D, B>
where D: Random + Optionable, B: Borrow<RefCell<D>>
{
    fn getopt(&self, id: i32, query: &dyn Any) -> Result<Box<dyn Any>> {
        self.shared()?.getopt(id, query)
    }

    fn setopt(&mut self, id: i32, query: &dyn Any, input: &dyn Any)
        -> Result<Box<dyn Any>>
    {
        self.shared_mut()?.setopt(id, query, input)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::rc::Rc;

    use tempfile::tempfile;

    use super::*;
    use crate::device::{read_full, ErrorCode};
    use crate::mem::MemoryDevice;

    fn rule() -> RefCell<MemoryDevice> {
        RefCell::new(MemoryDevice::with_data(b"1234567890".to_vec()))
    }

    #[test]
    fn test_seek() {
        let dev = rule();
        let mut r1 = Multiplex::new(&dev);
        let mut buf = [0u8; 5];

        assert_eq!(0, r1.offset().unwrap());
        assert_eq!(1, r1.seek(1).unwrap());
        read_full(&mut r1, &mut buf).unwrap();
        assert_eq!(&buf, b"23456");
        assert_eq!(6, r1.tell());
    }

    #[test]
    fn test_independent_positions() {
        let dev = rule();
        let mut a = Multiplex::new(&dev);
        let mut b = Multiplex::new(&dev);
        a.seek(1).unwrap();
        b.seek(6).unwrap();
        assert_eq!(1, a.offset().unwrap());

        let mut buf = [0u8; 2];
        assert_eq!(b"23", a.read(&mut buf).unwrap());
        assert_eq!(b"78", b.read(&mut buf).unwrap());
        assert_eq!(b"45", a.read(&mut buf).unwrap());
        assert_eq!(b"90", b.read(&mut buf).unwrap());
        assert_eq!(5, a.offset().unwrap());
        assert_eq!(10, b.offset().unwrap());
        assert!(b.is_eof().unwrap());
        assert!(!a.is_eof().unwrap());
    }

    #[test]
    fn test_seek_does_not_disturb() {
        let dev = RefCell::new(MemoryDevice::with_data(vec![0u8; 32]));
        let mut a = Multiplex::new(&dev);
        let mut b = Multiplex::new(&dev);
        a.seek(10).unwrap();
        b.seek(20).unwrap();
        assert_eq!(10, a.offset().unwrap());
        assert_eq!(20, b.offset().unwrap());
    }

    #[test]
    fn test_interleaved_clone() {
        let dev = Rc::new(rule());
        let mut r1 = Multiplex::<MemoryDevice, _>::new(dev.clone());

        let mut buf = [0u8; 5];
        read_full(&mut r1, &mut buf).unwrap();
        assert_eq!(&buf, b"12345");

        let mut r2 = r1.clone();
        read_full(&mut r2, &mut buf).unwrap();
        assert_eq!(&buf, b"12345");

        read_full(&mut r1, &mut buf).unwrap();
        assert_eq!(&buf, b"67890");

        read_full(&mut r2, &mut buf).unwrap();
        assert_eq!(&buf, b"67890");
    }

    #[test]
    fn test_interleaved_writes() {
        let dev = RefCell::new(MemoryDevice::new());
        let mut a = Multiplex::new(&dev);
        let mut b = Multiplex::with_offset(&dev, 4);
        a.write(b"ab").unwrap();
        b.write(b"xy").unwrap();
        a.write(b"cd").unwrap();
        assert_eq!(6, b.size().unwrap());
        assert_eq!(b"abcdxy".to_vec(), dev.into_inner().into_vec());
    }

    #[test]
    fn test_truncate_tracks() {
        let dev = rule();
        let mut a = Multiplex::new(&dev);
        a.seek(3).unwrap();
        assert_eq!(4, a.truncate(4).unwrap());
        assert_eq!(4, a.size().unwrap());
        assert_eq!(3, a.offset().unwrap());
    }

    #[test]
    fn test_busy() {
        let dev = rule();
        let mut a = Multiplex::new(&dev);
        let _held = dev.borrow_mut();
        let e = a.seek(1).unwrap_err();
        assert_eq!(ErrorCode::ResourceBusy, e.code());
    }

    #[test]
    fn test_over_file() {
        let mut f = tempfile().unwrap();
        f.write_all(b"1234567890").unwrap();
        let dev = RefCell::new(f);
        let mut a = Multiplex::new(&dev);
        let mut b = Multiplex::new(&dev);
        a.seek(5).unwrap();

        let mut buf = [0u8; 5];
        read_full(&mut b, &mut buf).unwrap();
        assert_eq!(&buf, b"12345");
        read_full(&mut a, &mut buf).unwrap();
        assert_eq!(&buf, b"67890");
    }

    #[test]
    fn test_view_rd_range() {
        let dev = rule();
        let mut a = Multiplex::new(&dev);
        a.seek(7).unwrap();
        assert_eq!(b"345", &a.view_rd(OffsetRange::new(2, 5)).unwrap()[..]);
        assert_eq!(7, a.offset().unwrap());
        assert_eq!(b"890", &a.view_rd(OffsetRange::from_begin(7)).unwrap()[..]);

        let mut buf = [0u8; 3];
        assert_eq!(b"890", read_full(&mut a, &mut buf).unwrap());
    }

    #[test]
    fn test_view_rd_errors() {
        let dev = rule();
        let mut a = Multiplex::new(&dev);
        let e = a.view_rd(OffsetRange::new(8, 12)).unwrap_err();
        assert_eq!(ErrorCode::InvalidArgument, e.code());

        let _held = dev.borrow();
        let e = a.view_rd(OffsetRange::new(0, 2)).unwrap_err();
        assert_eq!(ErrorCode::ResourceBusy, e.code());
    }

    fn is_send<T: Send>() -> bool { true }

    #[test]
    fn test_send() {
        assert!(is_send::<Multiplex<MemoryDevice, Box<RefCell<MemoryDevice>>>>());
    }
}
