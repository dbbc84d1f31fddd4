//! VGA text mode screen device.

use crate::arch::x86_64::vga::{self, TEXT_MODE};
use probeos_hal::{CharDevice, Device, DeviceError};

/// Check a requested screen size against text mode.
///
/// Zero in either dimension selects the text mode default.
pub fn check_size(width: usize, height: usize) -> Result<(usize, usize), DeviceError> {
    let (columns, rows) = TEXT_MODE;
    let width = if width == 0 { columns } else { width };
    let height = if height == 0 { rows } else { height };
    if (width, height) != TEXT_MODE {
        return Err(DeviceError::Unsupported);
    }
    Ok((width, height))
}

/// The VGA text screen as a character device.
pub struct Screen {
    width: usize,
    height: usize,
    ready: bool,
}

impl Screen {
    /// Screen of the requested size; 0 means the default.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ready: false,
        }
    }
}

impl Device for Screen {
    fn name(&self) -> &'static str {
        "screen"
    }

    fn initialize(&mut self) -> Result<(), DeviceError> {
        if self.ready {
            return Err(DeviceError::AlreadyInitialized);
        }
        let (width, height) = check_size(self.width, self.height)?;
        vga::init(width, height);
        self.ready = true;
        Ok(())
    }
}

impl CharDevice for Screen {
    fn write_str(&mut self, s: &str) {
        if self.ready {
            vga::write_str(s);
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        None
    }
}
