//! USB host controller discovery.
//!
//! Finds every USB host controller on the PCI bus and enables it for DMA.
//! Devices behind the controllers are not enumerated.

use crate::arch::x86_64::pci::{self, PciDevice};
use alloc::vec::Vec;
use probeos_hal::{Device, DeviceError};

/// The USB host controllers of the machine.
#[derive(Default)]
pub struct UsbHost {
    controllers: Vec<PciDevice>,
}

impl UsbHost {
    /// Create a host with no controllers attached yet.
    pub fn new() -> Self {
        Self {
            controllers: Vec::new(),
        }
    }

    /// Controllers found during initialization.
    pub fn controllers(&self) -> &[PciDevice] {
        &self.controllers
    }

    fn attach(&mut self, found: Vec<PciDevice>) -> Result<(), DeviceError> {
        if !self.controllers.is_empty() {
            return Err(DeviceError::AlreadyInitialized);
        }
        if found.is_empty() {
            return Err(DeviceError::NotFound);
        }
        self.controllers = found;
        Ok(())
    }
}

impl Device for UsbHost {
    fn name(&self) -> &'static str {
        "usb"
    }

    fn initialize(&mut self) -> Result<(), DeviceError> {
        self.attach(pci::find_usb_controllers())?;
        for controller in &self.controllers {
            controller.enable();
            if let Some(kind) = controller.usb_kind() {
                log::info!(
                    target: "usb",
                    "{} controller {:04x}:{:04x} at {} (irq {})",
                    kind,
                    controller.vendor_id,
                    controller.device_id,
                    controller.addr,
                    controller.irq
                );
            }
        }
        Ok(())
    }
}
