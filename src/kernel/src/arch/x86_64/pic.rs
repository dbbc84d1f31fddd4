//! Chained 8259 interrupt controllers.
//!
//! IRQs 0..15 are remapped above the CPU exception vectors.

use pic8259::ChainedPics;
use spin::Mutex;

/// Vector of IRQ 0 (master PIC).
pub const PIC_1_OFFSET: u8 = 32;

/// Vector of IRQ 8 (slave PIC).
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

/// The chained PICs.
// SAFETY: The offsets do not overlap the exception vectors 0..32.
pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// Hardware interrupt vectors the kernel handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptIndex {
    /// PIT channel 0 (IRQ 0).
    Timer = PIC_1_OFFSET,
    /// PS/2 keyboard (IRQ 1).
    Keyboard,
}

impl InterruptIndex {
    /// Vector number.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Vector number as an IDT index.
    pub fn as_usize(self) -> usize {
        usize::from(self as u8)
    }
}

/// Remap and unmask both controllers.
///
/// # Safety
///
/// The IDT must have handlers installed for every vector the PICs can raise
/// once interrupts are enabled.
pub unsafe fn init() {
    PICS.lock().initialize();
}

/// Signal end of interrupt for `vector`.
pub fn end_of_interrupt(vector: u8) {
    // SAFETY: Called from handlers for vectors raised by the PICs, so the
    // EOI always matches an in-service interrupt.
    unsafe {
        PICS.lock().notify_end_of_interrupt(vector);
    }
}
