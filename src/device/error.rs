use std::fmt;
use std::io;

use failure::Fail;

/// Result type of all device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// POSIX-style condition codes reported by device operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Ill-formed or out-of-bounds argument or range (`EINVAL`).
    InvalidArgument,
    /// Size or offset outside the addressable domain (`EOVERFLOW`).
    ValueTooLarge,
    /// Storage growth could not be satisfied (`ENOMEM`).
    NotEnoughMemory,
    /// Operation not supported by this device or representation (`ENOSYS`).
    NotSupported,
    /// Shared inner device is already borrowed (`EBUSY`).
    ResourceBusy,
    /// Failure reported by an underlying `std::io` operation.
    Io,
}

impl ErrorCode {
    /// Return the closest `io::ErrorKind`.
    pub fn io_kind(self) -> io::ErrorKind {
        match self {
            ErrorCode::InvalidArgument => io::ErrorKind::InvalidInput,
            ErrorCode::ValueTooLarge   => io::ErrorKind::InvalidInput,
            ErrorCode::NotEnoughMemory => io::ErrorKind::OutOfMemory,
            ErrorCode::NotSupported    => io::ErrorKind::Unsupported,
            ErrorCode::ResourceBusy    => io::ErrorKind::WouldBlock,
            ErrorCode::Io              => io::ErrorKind::Other,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::ValueTooLarge   => "value too large",
            ErrorCode::NotEnoughMemory => "not enough memory",
            ErrorCode::NotSupported    => "function not supported",
            ErrorCode::ResourceBusy    => "device or resource busy",
            ErrorCode::Io              => "I/O error",
        };
        f.write_str(s)
    }
}

/// Error returned by device operations.
///
/// May be converted to and from `io::Error`, so devices compose with
/// `std::io` code using `?`.
#[derive(Debug, Fail)]
pub enum DeviceError {
    /// A condition code with a static detail message.
    #[fail(display = "{}: {}", _0, _1)]
    Code(ErrorCode, &'static str),

    /// An `io::Error` from an underlying file or OS call.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),
}

impl DeviceError {
    pub fn invalid_argument(detail: &'static str) -> Self {
        DeviceError::Code(ErrorCode::InvalidArgument, detail)
    }

    pub fn value_too_large(detail: &'static str) -> Self {
        DeviceError::Code(ErrorCode::ValueTooLarge, detail)
    }

    pub fn not_enough_memory(detail: &'static str) -> Self {
        DeviceError::Code(ErrorCode::NotEnoughMemory, detail)
    }

    pub fn not_supported(detail: &'static str) -> Self {
        DeviceError::Code(ErrorCode::NotSupported, detail)
    }

    pub fn busy(detail: &'static str) -> Self {
        DeviceError::Code(ErrorCode::ResourceBusy, detail)
    }

    /// Return the condition code of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DeviceError::Code(c, _) => *c,
            DeviceError::Io(_) => ErrorCode::Io,
        }
    }
}

impl From<io::Error> for DeviceError {
    fn from(e: io::Error) -> DeviceError {
        DeviceError::Io(e)
    }
}

impl From<DeviceError> for io::Error {
    fn from(de: DeviceError) -> io::Error {
        match de {
            DeviceError::Io(e) => e,
            other => io::Error::new(other.code().io_kind(), other.compat()),
        }
    }
}

/// A caller-owned slot for non-raising error reporting.
///
/// Operations report into the slot via `settle`: on success the slot is
/// cleared, on failure it is set and a default value is returned in place
/// of the operation's value.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    error: Option<DeviceError>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        ErrorSlot { error: None }
    }

    pub fn clear(&mut self) {
        self.error = None;
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&DeviceError> {
        self.error.as_ref()
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(DeviceError::code)
    }

    /// Take the recorded error, leaving the slot clear.
    pub fn take(&mut self) -> Option<DeviceError> {
        self.error.take()
    }

    /// Record the outcome of an operation, returning its value on success
    /// or `T::default()` on failure.
    pub fn settle<T: Default>(&mut self, result: Result<T>) -> T {
        match result {
            Ok(v) => {
                self.error = None;
                v
            }
            Err(e) => {
                self.error = Some(e);
                T::default()
            }
        }
    }
}

/// Report `result` into `slot` when one is supplied, otherwise return it
/// unchanged for `?` propagation. With a slot, this never returns `Err`.
pub fn set_or_raise<T: Default>(slot: Option<&mut ErrorSlot>, result: Result<T>)
    -> Result<T>
{
    match slot {
        Some(slot) => Ok(slot.settle(result)),
        None => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing() -> Result<u64> {
        Err(DeviceError::not_supported("test"))
    }

    #[test]
    fn test_slot_set_and_clear() {
        let mut slot = ErrorSlot::new();
        assert_eq!(0, slot.settle(failing()));
        assert!(slot.has_error());
        assert_eq!(Some(ErrorCode::NotSupported), slot.code());

        assert_eq!(7, slot.settle(Ok(7u64)));
        assert!(!slot.has_error());
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_set_or_raise() {
        let mut slot = ErrorSlot::new();
        let v = set_or_raise(Some(&mut slot), failing());
        assert_eq!(0, v.unwrap());
        assert!(slot.has_error());

        let e = set_or_raise(None, failing()).unwrap_err();
        assert_eq!(ErrorCode::NotSupported, e.code());
    }

    #[test]
    fn test_io_conversion() {
        let e: io::Error = DeviceError::invalid_argument("range").into();
        assert_eq!(io::ErrorKind::InvalidInput, e.kind());
        assert!(e.to_string().contains("invalid argument"));

        let de: DeviceError = io::Error::new(io::ErrorKind::Other, "x").into();
        assert_eq!(ErrorCode::Io, de.code());
        let back: io::Error = de.into();
        assert_eq!(io::ErrorKind::Other, back.kind());
    }

    fn is_send<T: Send>() -> bool { true }
    fn is_sync<T: Sync>() -> bool { true }

    #[test]
    fn test_send_sync() {
        assert!(is_send::<DeviceError>());
        assert!(is_sync::<DeviceError>());
    }
}
