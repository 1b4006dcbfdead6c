use bytes::Bytes;
use log::debug;

#[cfg(feature = "mmap")]
use memmap::MmapMut;

use crate::device::{DeviceError, Result};

/// Storage backing a `MemoryDevice`: a byte sequence and a position.
///
/// Read-only representations implement only this trait, giving the device
/// read-side capabilities.
pub trait Represent {
    /// The current bytes of storage. Its length is the device size.
    fn data(&self) -> &[u8];

    fn pos(&self) -> usize;

    fn set_pos(&mut self, pos: usize);

    /// Allocated capacity in bytes, at least the data length.
    fn capacity(&self) -> usize {
        self.data().len()
    }

    /// Reserve total capacity of at least `capacity` bytes. Storage which
    /// can't grow reports `NotSupported`.
    fn reserve(&mut self, _capacity: usize) -> Result<()> {
        Err(DeviceError::not_supported("fixed size representation"))
    }
}

/// Writable storage.
pub trait RepresentMut: Represent {
    fn data_mut(&mut self) -> &mut [u8];

    /// Resize storage to exactly `len` bytes, zero filling any new tail.
    /// Fixed width storage accepts only its current length and otherwise
    /// reports `NotSupported`.
    fn resize(&mut self, len: usize) -> Result<()> {
        if len == self.data().len() {
            Ok(())
        } else {
            Err(DeviceError::not_supported("fixed size representation"))
        }
    }
}

// Resize a Vec, reporting allocation failure instead of aborting. Growth
// is amortized like `Vec::resize`.
fn resize_vec(data: &mut Vec<u8>, len: usize) -> Result<()> {
    if len > data.len() {
        data.try_reserve(len - data.len())
            .map_err(|_| DeviceError::not_enough_memory("storage growth"))?;
        debug!("growing memory storage {} -> {}", data.len(), len);
    }
    data.resize(len, 0);
    Ok(())
}

fn reserve_vec(data: &mut Vec<u8>, capacity: usize) -> Result<()> {
    if capacity > data.len() {
        data.try_reserve_exact(capacity - data.len())
            .map_err(|_| DeviceError::not_enough_memory("storage reserve"))?;
    }
    Ok(())
}

/// Owned, growable storage with an internal position. The default for
/// `MemoryDevice`.
#[derive(Clone, Debug, Default)]
pub struct VecRepr {
    data: Vec<u8>,
    pos: usize,
}

impl VecRepr {
    pub fn new(data: Vec<u8>) -> Self {
        VecRepr { data, pos: 0 }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl Represent for VecRepr {
    fn data(&self) -> &[u8] { &self.data }

    fn pos(&self) -> usize { self.pos }

    fn set_pos(&mut self, pos: usize) { self.pos = pos }

    fn capacity(&self) -> usize { self.data.capacity() }

    fn reserve(&mut self, capacity: usize) -> Result<()> {
        reserve_vec(&mut self.data, capacity)
    }
}

impl RepresentMut for VecRepr {
    fn data_mut(&mut self) -> &mut [u8] { &mut self.data }

    fn resize(&mut self, len: usize) -> Result<()> {
        resize_vec(&mut self.data, len)
    }
}

/// Externally owned, growable storage and position.
#[derive(Debug)]
pub struct RefRepr<'a> {
    data: &'a mut Vec<u8>,
    pos: &'a mut usize,
}

impl<'a> RefRepr<'a> {
    pub fn new(data: &'a mut Vec<u8>, pos: &'a mut usize) -> Self {
        RefRepr { data, pos }
    }
}

impl<'a> Represent for RefRepr<'a> {
    fn data(&self) -> &[u8] { &self.data[..] }

    fn pos(&self) -> usize { *self.pos }

    fn set_pos(&mut self, pos: usize) { *self.pos = pos }

    fn capacity(&self) -> usize { self.data.capacity() }

    fn reserve(&mut self, capacity: usize) -> Result<()> {
        reserve_vec(&mut *self.data, capacity)
    }
}

impl<'a> RepresentMut for RefRepr<'a> {
    fn data_mut(&mut self) -> &mut [u8] { &mut self.data[..] }

    fn resize(&mut self, len: usize) -> Result<()> {
        resize_vec(&mut *self.data, len)
    }
}

/// Externally owned, fixed width, writable storage and position.
#[derive(Debug)]
pub struct SliceRepr<'a> {
    data: &'a mut [u8],
    pos: &'a mut usize,
}

impl<'a> SliceRepr<'a> {
    pub fn new(data: &'a mut [u8], pos: &'a mut usize) -> Self {
        SliceRepr { data, pos }
    }
}

impl<'a> Represent for SliceRepr<'a> {
    fn data(&self) -> &[u8] { &self.data[..] }

    fn pos(&self) -> usize { *self.pos }

    fn set_pos(&mut self, pos: usize) { *self.pos = pos }
}

impl<'a> RepresentMut for SliceRepr<'a> {
    fn data_mut(&mut self) -> &mut [u8] { &mut self.data[..] }
}

/// Externally owned, read-only storage and position.
#[derive(Debug)]
pub struct ConstRepr<'a> {
    data: &'a [u8],
    pos: &'a mut usize,
}

impl<'a> ConstRepr<'a> {
    pub fn new(data: &'a [u8], pos: &'a mut usize) -> Self {
        ConstRepr { data, pos }
    }
}

impl<'a> Represent for ConstRepr<'a> {
    fn data(&self) -> &[u8] { self.data }

    fn pos(&self) -> usize { *self.pos }

    fn set_pos(&mut self, pos: usize) { *self.pos = pos }
}

/// Shared, reference counted, read-only storage with an internal
/// position. Cloning is inexpensive and the clone keeps its own position.
#[derive(Clone, Debug, Default)]
pub struct BytesRepr {
    data: Bytes,
    pos: usize,
}

impl BytesRepr {
    pub fn new<B: Into<Bytes>>(data: B) -> Self {
        BytesRepr { data: data.into(), pos: 0 }
    }

    /// Return a shared handle to the stored bytes.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }
}

impl Represent for BytesRepr {
    fn data(&self) -> &[u8] { &self.data }

    fn pos(&self) -> usize { self.pos }

    fn set_pos(&mut self, pos: usize) { self.pos = pos }
}

/// Fixed size storage in an anonymous, read-write memory map.
#[cfg(feature = "mmap")]
#[derive(Debug)]
pub struct MmapRepr {
    map: MmapMut,
    pos: usize,
}

#[cfg(feature = "mmap")]
impl MmapRepr {
    /// Map `len` zeroed bytes. Fails with `InvalidArgument` for zero length
    /// or an `Io` error if the platform refuses the mapping.
    pub fn anon(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(DeviceError::invalid_argument("empty memory map"));
        }
        let map = MmapMut::map_anon(len)?;
        Ok(MmapRepr { map, pos: 0 })
    }
}

#[cfg(feature = "mmap")]
impl Represent for MmapRepr {
    fn data(&self) -> &[u8] { &self.map }

    fn pos(&self) -> usize { self.pos }

    fn set_pos(&mut self, pos: usize) { self.pos = pos }
}

#[cfg(feature = "mmap")]
impl RepresentMut for MmapRepr {
    fn data_mut(&mut self) -> &mut [u8] { &mut self.map }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ErrorCode;

    #[test]
    fn test_vec_resize() {
        let mut r = VecRepr::new(vec![1, 2, 3]);
        r.resize(5).unwrap();
        assert_eq!(&[1u8, 2, 3, 0, 0], r.data());
        r.resize(1).unwrap();
        assert_eq!(&[1u8], r.data());
    }

    #[test]
    fn test_ref_resize_visible() {
        let mut v = vec![9u8; 2];
        let mut p = 0;
        {
            let mut r = RefRepr::new(&mut v, &mut p);
            r.resize(4).unwrap();
            r.set_pos(3);
        }
        assert_eq!(vec![9u8, 9, 0, 0], v);
        assert_eq!(3, p);
    }

    #[test]
    fn test_slice_fixed() {
        let mut b = [0u8; 4];
        let mut p = 0;
        let mut r = SliceRepr::new(&mut b, &mut p);
        assert_eq!(ErrorCode::NotSupported, r.resize(8).unwrap_err().code());
        assert_eq!(ErrorCode::NotSupported, r.resize(3).unwrap_err().code());
        assert_eq!(ErrorCode::NotSupported, r.reserve(8).unwrap_err().code());
        assert_eq!(4, r.capacity());
    }

    #[test]
    fn test_fixed_same_size_resize() {
        let mut b = [5u8; 4];
        let mut p = 0;
        let mut r = SliceRepr::new(&mut b, &mut p);
        r.resize(4).unwrap();
        assert_eq!(&[5u8; 4], r.data());
    }

    #[test]
    fn test_vec_growth_amortized() {
        let mut r = VecRepr::default();
        let mut changes = 0;
        let mut cap = r.capacity();
        for len in 1..=10_000 {
            r.resize(len).unwrap();
            if r.capacity() != cap {
                changes += 1;
                cap = r.capacity();
            }
        }
        assert!(changes < 100, "{} capacity changes", changes);
    }

    #[test]
    fn test_reserve() {
        let mut r = VecRepr::default();
        r.reserve(100).unwrap();
        assert!(r.capacity() >= 100);
        assert_eq!(0, r.data().len());
    }

    #[test]
    fn test_bytes_clone_independent() {
        let mut a = BytesRepr::new(&b"shared"[..]);
        a.set_pos(3);
        let b = a.clone();
        a.set_pos(5);
        assert_eq!(3, b.pos());
        assert_eq!(b"shared", &b.bytes()[..]);
    }

    #[cfg(feature = "mmap")]
    #[test]
    fn test_mmap_anon() {
        let mut r = MmapRepr::anon(4096).unwrap();
        assert_eq!(4096, r.data().len());
        r.data_mut()[4095] = 7;
        assert_eq!(7, r.data()[4095]);
        assert_eq!(ErrorCode::NotSupported, r.resize(1).unwrap_err().code());
        assert_eq!(
            ErrorCode::InvalidArgument,
            MmapRepr::anon(0).unwrap_err().code()
        );
    }
}
