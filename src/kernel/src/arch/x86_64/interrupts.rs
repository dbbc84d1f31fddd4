//! Interrupt Descriptor Table (IDT) and exception handlers for x86_64.

use crate::arch::x86_64::gdt;
use crate::arch::x86_64::pic::{self, InterruptIndex};
use crate::{println, serial_println};
use lazy_static::lazy_static;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame};

lazy_static! {
    /// The Interrupt Descriptor Table (IDT).
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        // SAFETY: DOUBLE_FAULT_IST_INDEX is a valid IST slot populated by
        // gdt::init, which runs before the IDT is loaded.
        unsafe {
            idt.double_fault.set_handler_fn(double_fault_handler)
                .set_stack_index(gdt::DOUBLE_FAULT_IST_INDEX);
        }
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.general_protection_fault.set_handler_fn(general_protection_fault_handler);
        idt.divide_error.set_handler_fn(divide_error_handler);

        // Hardware interrupts
        idt[InterruptIndex::Timer.as_usize()]
            .set_handler_fn(timer_interrupt_handler);
        idt[InterruptIndex::Keyboard.as_usize()]
            .set_handler_fn(keyboard_interrupt_handler);

        idt
    };
}

/// Loads the IDT.
///
/// The PICs are remapped and interrupts enabled separately by the interrupt
/// system driver.
pub fn init_idt() {
    IDT.load();
}

/// Handler for the timer interrupt.
extern "x86-interrupt" fn timer_interrupt_handler(_stack_frame: InterruptStackFrame) {
    crate::drivers::timer::tick();
    pic::end_of_interrupt(InterruptIndex::Timer.as_u8());
}

/// Handler for the keyboard interrupt.
extern "x86-interrupt" fn keyboard_interrupt_handler(_stack_frame: InterruptStackFrame) {
    use x86_64::instructions::port::Port;

    let mut port = Port::new(0x60);
    // SAFETY: Port 0x60 is the PS/2 data port; reading it acknowledges the byte.
    let scancode: u8 = unsafe { port.read() };
    crate::drivers::keyboard::add_scancode(scancode);
    pic::end_of_interrupt(InterruptIndex::Keyboard.as_u8());
}

/// Prints an exception report on the screen and mirrors it to serial.
fn report(name: &str, stack_frame: &InterruptStackFrame, detail: core::fmt::Arguments) {
    println!("EXCEPTION: {}\n{}\n{:#?}", name, detail, stack_frame);
    serial_println!("EXCEPTION: {} ({}) at {:?}", name, detail, stack_frame.instruction_pointer);
}

/// Handler for the breakpoint exception (INT3).
extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    log::warn!(target: "interrupt", "breakpoint at {:?}", stack_frame.instruction_pointer);
}

/// Handler for the double fault exception.
extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    panic!("EXCEPTION: DOUBLE FAULT\n{:#?}", stack_frame);
}

/// Handler for the page fault exception.
extern "x86-interrupt" fn page_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: x86_64::structures::idt::PageFaultErrorCode,
) {
    use x86_64::registers::control::Cr2;

    report(
        "PAGE FAULT",
        &stack_frame,
        format_args!("address {:?}, error {:?}", Cr2::read(), error_code),
    );
    crate::arch::x86_64::halt_loop();
}

/// Handler for the general protection fault exception.
extern "x86-interrupt" fn general_protection_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    report(
        "GENERAL PROTECTION FAULT",
        &stack_frame,
        format_args!("error {:#x}", error_code),
    );
    crate::arch::x86_64::halt_loop();
}

/// Handler for the divide error exception.
extern "x86-interrupt" fn divide_error_handler(stack_frame: InterruptStackFrame) {
    report("DIVIDE ERROR", &stack_frame, format_args!("-"));
    crate::arch::x86_64::halt_loop();
}
