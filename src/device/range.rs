use std::ops::{Range, RangeFrom};

use crate::device::{DeviceError, Result};

/// Sentinel `OffsetRange::end` meaning unbounded or unknown.
pub const UNKNOWN_OFFSET: i64 = i64::MAX;

/// Size reported by devices without a known size, e.g. `mem::Zero`.
pub const UNKNOWN_SIZE: u64 = UNKNOWN_OFFSET as u64;

/// A half-open `[begin, end)` range of device offsets.
///
/// `end` may be `UNKNOWN_OFFSET`, in which case it is resolved against the
/// device size at the time of use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OffsetRange {
    pub begin: i64,
    pub end: i64,
}

impl OffsetRange {
    pub const fn new(begin: i64, end: i64) -> Self {
        OffsetRange { begin, end }
    }

    /// New range from begin to an unknown end.
    pub const fn from_begin(begin: i64) -> Self {
        OffsetRange { begin, end: UNKNOWN_OFFSET }
    }

    /// The whole of any device: `[0, unknown)`.
    pub const fn whole() -> Self {
        OffsetRange::from_begin(0)
    }

    pub fn is_bounded(&self) -> bool {
        self.end != UNKNOWN_OFFSET
    }

    /// Return `true` if begin is non-negative and end is either unknown, or
    /// non-negative and not less than begin.
    pub fn is_valid(&self) -> bool {
        self.begin >= 0 &&
            (self.end == UNKNOWN_OFFSET ||
             (self.end >= 0 && self.begin <= self.end))
    }

    /// Like `is_valid`, additionally requiring a known end to be within
    /// `size`.
    pub fn is_valid_within(&self, size: u64) -> bool {
        self.is_valid() &&
            (self.end == UNKNOWN_OFFSET || (self.end as u64) <= size)
    }

    /// Return the length of a bounded range, or `None` if end is unknown.
    pub fn len(&self) -> Option<u64> {
        if self.is_bounded() {
            Some((self.end - self.begin) as u64)
        } else {
            None
        }
    }

    /// Return `true` for a bounded range of zero length.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Return the begin offset as unsigned. Panics on a negative begin.
    pub fn start(&self) -> u64 {
        assert!(self.begin >= 0, "negative range begin");
        self.begin as u64
    }

    /// Return the end offset as unsigned, `UNKNOWN_SIZE` if unknown.
    pub fn stop(&self) -> u64 {
        if self.is_bounded() {
            assert!(self.end >= 0, "negative range end");
            self.end as u64
        } else {
            UNKNOWN_SIZE
        }
    }

    /// Replace an unknown end with `size`.
    pub fn resolve(self, size: u64) -> Self {
        if self.is_bounded() {
            self
        } else {
            OffsetRange { begin: self.begin, end: offset_of(size) }
        }
    }

    /// Translate both ends by `by`, keeping an unknown end unknown. Fails
    /// with `ValueTooLarge` on overflow.
    pub fn translate(self, by: u64) -> Result<Self> {
        let by = i64::try_from(by)
            .map_err(|_| DeviceError::value_too_large("range shift"))?;
        let begin = self.begin.checked_add(by)
            .filter(|b| *b != UNKNOWN_OFFSET)
            .ok_or_else(|| DeviceError::value_too_large("range begin"))?;
        let end = if self.is_bounded() {
            self.end.checked_add(by)
                .filter(|e| *e != UNKNOWN_OFFSET)
                .ok_or_else(|| DeviceError::value_too_large("range end"))?
        } else {
            UNKNOWN_OFFSET
        };
        Ok(OffsetRange { begin, end })
    }
}

impl Default for OffsetRange {
    fn default() -> Self {
        OffsetRange::whole()
    }
}

impl From<Range<i64>> for OffsetRange {
    fn from(r: Range<i64>) -> Self {
        OffsetRange::new(r.start, r.end)
    }
}

impl From<RangeFrom<i64>> for OffsetRange {
    fn from(r: RangeFrom<i64>) -> Self {
        OffsetRange::from_begin(r.start)
    }
}

// Saturating conversion of a size to an offset, where sizes at or beyond
// the sentinel are unknown.
fn offset_of(size: u64) -> i64 {
    if size >= UNKNOWN_SIZE { UNKNOWN_OFFSET } else { size as i64 }
}

/// Narrow a 64-bit size or offset to `usize`, failing with `ValueTooLarge`
/// if it is outside the platform's addressable domain.
pub fn to_usize(n: u64) -> Result<usize> {
    usize::try_from(n)
        .map_err(|_| DeviceError::value_too_large("exceeds usize"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ErrorCode;

    #[test]
    fn test_validity() {
        assert!(OffsetRange::new(0, 0).is_valid());
        assert!(OffsetRange::new(3, 10).is_valid());
        assert!(OffsetRange::from_begin(5).is_valid());
        assert!(!OffsetRange::new(-1, 10).is_valid());
        assert!(!OffsetRange::new(10, 3).is_valid());
        assert!(!OffsetRange::new(0, -2).is_valid());

        assert!(OffsetRange::new(0, 10).is_valid_within(10));
        assert!(!OffsetRange::new(0, 11).is_valid_within(10));
        assert!(OffsetRange::from_begin(0).is_valid_within(0));
    }

    #[test]
    fn test_len_and_resolve() {
        assert_eq!(Some(90), OffsetRange::from(10..100).len());
        assert_eq!(None, OffsetRange::from(10..).len());
        assert!(OffsetRange::new(4, 4).is_empty());

        let r = OffsetRange::from(10..).resolve(42);
        assert_eq!(OffsetRange::new(10, 42), r);
        let r = OffsetRange::from(1..2).resolve(42);
        assert_eq!(OffsetRange::new(1, 2), r);
        assert!(!OffsetRange::whole().resolve(UNKNOWN_SIZE).is_bounded());
    }

    #[test]
    fn test_translate() {
        let r = OffsetRange::new(2, 8).translate(10).unwrap();
        assert_eq!(OffsetRange::new(12, 18), r);

        let r = OffsetRange::from_begin(2).translate(10).unwrap();
        assert_eq!(OffsetRange::from_begin(12), r);

        let e = OffsetRange::new(0, i64::MAX - 1).translate(5).unwrap_err();
        assert_eq!(ErrorCode::ValueTooLarge, e.code());

        let e = OffsetRange::new(0, 1).translate(u64::MAX).unwrap_err();
        assert_eq!(ErrorCode::ValueTooLarge, e.code());
    }

    #[test]
    fn test_to_usize() {
        assert_eq!(42usize, to_usize(42).unwrap());
        #[cfg(target_pointer_width = "32")]
        assert!(to_usize(u64::MAX).is_err());
    }
}
