//! x86_64 architecture support.
//!
//! Provides descriptor tables, interrupt handling, the legacy timer, PCI
//! configuration access, VGA text mode output and serial port communication.

pub mod gdt;
pub mod interrupts;
pub mod pci;
pub mod pic;
pub mod pit;
pub mod serial;
pub mod vga;

pub use serial::SERIAL;
pub use vga::Color;

/// Halts the CPU until the next interrupt.
///
/// Used in idle loops to reduce power consumption.
#[inline]
pub fn hlt() {
    x86_64::instructions::hlt();
}

/// Halts the CPU in an infinite loop.
///
/// Used after unrecoverable errors (panics) and on shutdown.
pub fn halt_loop() -> ! {
    loop {
        hlt();
    }
}

/// Resets the machine through the keyboard controller.
///
/// Falls back to halting if the reset line does not trigger.
pub fn reboot() -> ! {
    use x86_64::instructions::port::Port;

    x86_64::instructions::interrupts::disable();
    // SAFETY: Port 0x64 is the 8042 keyboard controller command port.
    // Command 0xFE pulses the CPU reset line.
    unsafe {
        let mut command: Port<u8> = Port::new(0x64);
        command.write(0xFE);
    }
    halt_loop()
}
