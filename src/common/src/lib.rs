//! Types shared between the ProbeOS kernel and its hardware abstraction layer.

#![no_std]

pub mod error;
pub mod fs;
pub mod shutdown;

pub use error::{DeviceError, FsError};
pub use shutdown::ShutdownMode;
