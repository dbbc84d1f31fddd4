//! ProbeOS Hardware Abstraction Layer (HAL) traits.
//!
//! This crate defines traits that abstract away platform-specific hardware details.

#![no_std]

pub use probeos_common::DeviceError;

/// Trait for a peripheral that needs a one-time initialization step.
pub trait Device {
    /// Short name used in boot messages.
    fn name(&self) -> &'static str;
    /// Brings the device into a usable state.
    fn initialize(&mut self) -> Result<(), DeviceError>;
}

/// Trait for a serial port or similar character-based communication channel.
pub trait Serial {
    /// Writes a single byte to the serial port.
    fn write_byte(&mut self, byte: u8);
    /// Reads a single byte from the serial port, if available.
    fn read_byte(&mut self) -> Option<u8>;
}

/// Trait for a character device usable as standard input and output.
pub trait CharDevice {
    /// Writes a string to the device.
    fn write_str(&mut self, s: &str);
    /// Reads the next input byte.
    ///
    /// May block until input arrives. Returns `None` at end of input.
    fn read_byte(&mut self) -> Option<u8>;
}

/// Trait for a block-addressed storage device.
pub trait BlockDevice {
    /// Size of one block in bytes.
    fn block_size(&self) -> usize;
    /// Number of addressable blocks.
    fn block_count(&self) -> u64;
    /// Reads block `lba` into `buf`, which must be exactly one block long.
    fn read_block(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DeviceError>;
    /// Writes `buf`, exactly one block long, to block `lba`.
    fn write_block(&mut self, lba: u64, buf: &[u8]) -> Result<(), DeviceError>;
}

/// Trait for a system timer.
pub trait Timer {
    /// Returns the number of ticks since the system started.
    fn current_ticks(&self) -> u64;
    /// Returns the tick rate in Hz.
    fn ticks_per_second(&self) -> u32;
}
