//! Unified error type for the sdrewire-lib crate.
//!
//! [`SdrewireError`] wraps [`DeviceError`] and the I/O / configuration error
//! kinds. `From` impls allow `?` to propagate across module boundaries.

use std::fmt;

use crate::device::DeviceError;

/// Unified error type for sdrewire-lib operations.
#[derive(Debug)]
pub enum SdrewireError {
    /// Device selection or control-transfer error.
    Device(DeviceError),
    /// Standard I/O error (config file read/write).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
}

impl fmt::Display for SdrewireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdrewireError::Device(e) => write!(f, "{e}"),
            SdrewireError::Io(e) => write!(f, "I/O error: {e}"),
            SdrewireError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for SdrewireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SdrewireError::Device(e) => Some(e),
            SdrewireError::Io(e) => Some(e),
            SdrewireError::Config(_) => None,
        }
    }
}

impl From<DeviceError> for SdrewireError {
    fn from(e: DeviceError) -> Self {
        SdrewireError::Device(e)
    }
}

impl From<std::io::Error> for SdrewireError {
    fn from(e: std::io::Error) -> Self {
        SdrewireError::Io(e)
    }
}

/// Crate-level Result alias using [`SdrewireError`].
pub type Result<T> = std::result::Result<T, SdrewireError>;
