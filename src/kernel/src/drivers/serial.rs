//! COM1 as a character device.

use crate::arch::x86_64::serial::{self, SerialWrapper};
use probeos_hal::{CharDevice, Device, DeviceError, Serial};

/// Name the serial port is registered under.
pub const SERIAL_DEVICE: &str = "ttyS1";

/// COM1 at a fixed baud rate.
pub struct SerialDevice {
    baud: u32,
    port: SerialWrapper,
    ready: bool,
}

impl SerialDevice {
    /// Serial device running at `baud`.
    pub fn new(baud: u32) -> Self {
        Self {
            baud,
            port: SerialWrapper,
            ready: false,
        }
    }
}

impl Device for SerialDevice {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn initialize(&mut self) -> Result<(), DeviceError> {
        if self.ready {
            return Err(DeviceError::AlreadyInitialized);
        }
        serial::init();
        serial::set_baud(self.baud)?;
        self.ready = true;
        Ok(())
    }
}

impl CharDevice for SerialDevice {
    fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.port.write_byte(b'\r');
            }
            self.port.write_byte(byte);
        }
    }

    /// Polls until a byte is received. The port never reports end of input.
    fn read_byte(&mut self) -> Option<u8> {
        loop {
            if let Some(byte) = self.port.read_byte() {
                return Some(byte);
            }
            core::hint::spin_loop();
        }
    }
}
