//! Interrupt system: descriptor tables, PICs and the interrupt flag.

use crate::arch::x86_64::{gdt, interrupts, pic};
use probeos_hal::{Device, DeviceError};

/// Owns interrupt delivery for the kernel.
#[derive(Default)]
pub struct InterruptSystem {
    ready: bool,
}

impl InterruptSystem {
    /// Create the interrupt system with interrupts still disabled.
    pub fn new() -> Self {
        Self { ready: false }
    }
}

impl Device for InterruptSystem {
    fn name(&self) -> &'static str {
        "interrupt"
    }

    fn initialize(&mut self) -> Result<(), DeviceError> {
        if self.ready {
            return Err(DeviceError::AlreadyInitialized);
        }
        gdt::init();
        interrupts::init_idt();
        // SAFETY: The IDT loaded above has handlers for the timer and
        // keyboard vectors, the only IRQs raised by the machines we run on.
        unsafe { pic::init() };
        x86_64::instructions::interrupts::enable();
        self.ready = true;
        Ok(())
    }
}
