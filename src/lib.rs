//! This crate provides a small set of composable I/O device capabilities
//! (read, write, seek, size, truncate, sync, mapped views, options), memory
//! backed and pseudo devices implementing them, and adaptors which window,
//! shift or multiplex an underlying device without changing what it is.
//!
//! ## Optional Features
//!
//! _mmap (default):_ Adds `mem::MmapRepr`, an anonymous memory map usable as
//! fixed size storage for a `mem::MemoryDevice`.

/// The crate version string.
pub static VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capability traits, dispatch functions, ranges and errors.
pub mod device {
    mod caps;
    mod error;
    mod range;

    pub use crate::device::caps::{
        copy, getopt, is_eof, offset, read, read_full, seek, seek_forward,
        setopt, size, sync, truncate, view_rd, view_wr, write, write_all,
        EofAware, Forward, Optionable, Random, ReadMappable, Reader,
        Sequenced, Sizeable, Syncable, Truncatable, WriteMappable, Writer,
    };
    pub use crate::device::error::{
        set_or_raise, DeviceError, ErrorCode, ErrorSlot, Result,
    };
    pub use crate::device::range::{
        to_usize, OffsetRange, UNKNOWN_OFFSET, UNKNOWN_SIZE,
    };

    /// Option identifiers for `Optionable` devices.
    pub mod opt {
        /// Storage capacity in bytes, as `u64`. Setting it, with a `u64`
        /// input, reserves at least that capacity.
        pub const CAPACITY: i32 = 1;
    }
}

/// Memory backed devices and pseudo devices.
pub mod mem {
    mod device;
    mod pseudo;
    mod repr;

    pub use crate::mem::device::MemoryDevice;
    pub use crate::mem::pseudo::{Empty, Fill, Null, Zero};
    pub use crate::mem::repr::{
        BytesRepr, ConstRepr, RefRepr, Represent, RepresentMut, SliceRepr,
        VecRepr,
    };

    #[cfg(feature = "mmap")]
    pub use crate::mem::repr::MmapRepr;
}

/// Device to device adaptors.
pub mod adapt {
    mod multiplex;
    mod shift;
    mod sub;
    mod view;

    pub use crate::adapt::multiplex::Multiplex;
    pub use crate::adapt::shift::Shift;
    pub use crate::adapt::sub::Sub;
    pub use crate::adapt::view::{CachedView, ViewReader, ViewWriter, WriteBack};
}

/// Filesystem `File` as a device.
pub mod fs {
    mod file;
}
