//! System-wide error types for ProbeOS.

use core::fmt;

/// Device and driver error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceError {
    /// Hardware was not found where expected
    NotFound,
    /// Device did not respond in time
    Timeout,
    /// Requested mode or parameter is not supported
    Unsupported,
    /// Device was already initialized
    AlreadyInitialized,
    /// Access beyond the end of the device
    OutOfRange,
    /// Buffer length does not match the device block size
    BadBufferSize,
    /// Not enough memory to set up the device
    NoMemory,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotFound => write!(f, "device not found"),
            DeviceError::Timeout => write!(f, "device timed out"),
            DeviceError::Unsupported => write!(f, "unsupported device mode"),
            DeviceError::AlreadyInitialized => write!(f, "device already initialized"),
            DeviceError::OutOfRange => write!(f, "access out of device range"),
            DeviceError::BadBufferSize => write!(f, "buffer size does not match block size"),
            DeviceError::NoMemory => write!(f, "out of memory"),
        }
    }
}

/// Filesystem error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FsError {
    /// No file with this name
    NotFound,
    /// Operation not allowed by the open mode
    PermissionDenied,
    /// Handle is not open
    InvalidHandle,
    /// Volume is not mounted
    NotMounted,
    /// Volume is already mounted
    AlreadyMounted,
    /// Path is empty or contains a directory separator
    InvalidPath,
    /// Volume image does not fit on the device
    NoSpace,
    /// On-disk image is malformed
    Corrupt,
    /// Underlying block device failed
    Device(DeviceError),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "file not found"),
            FsError::PermissionDenied => write!(f, "permission denied"),
            FsError::InvalidHandle => write!(f, "invalid file handle"),
            FsError::NotMounted => write!(f, "volume not mounted"),
            FsError::AlreadyMounted => write!(f, "volume already mounted"),
            FsError::InvalidPath => write!(f, "invalid path"),
            FsError::NoSpace => write!(f, "no space left on device"),
            FsError::Corrupt => write!(f, "corrupt volume image"),
            FsError::Device(err) => write!(f, "device error: {}", err),
        }
    }
}

impl From<DeviceError> for FsError {
    fn from(err: DeviceError) -> Self {
        FsError::Device(err)
    }
}
