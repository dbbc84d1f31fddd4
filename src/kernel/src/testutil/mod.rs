//! Test infrastructure for the ProbeOS kernel.
//!
//! Host unit tests use the device doubles in [`doubles`]. Bare-metal tests
//! under `tests/` run in QEMU and report through the isa-debug-exit device:
//!
//! ```rust,ignore
//! #![feature(custom_test_frameworks)]
//! #![test_runner(probeos_kernel::testutil::test_runner)]
//! ```

#[cfg(test)]
pub mod doubles;

use crate::serial_println;

/// QEMU exit codes for signaling test results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    /// All tests passed.
    Success = 0x10,
    /// One or more tests failed.
    Failed = 0x11,
}

/// Exit QEMU with the given exit code.
///
/// QEMU must be started with `-device isa-debug-exit,iobase=0xf4,iosize=0x04`.
/// The process exit code is `(value << 1) | 1`, so `Success` becomes 33 and
/// `Failed` becomes 35.
pub fn exit_qemu(exit_code: QemuExitCode) {
    #[cfg(target_arch = "x86_64")]
    {
        use x86_64::instructions::port::Port;

        // SAFETY: Port 0xf4 is the isa-debug-exit device in the test
        // configuration; writing it terminates QEMU.
        unsafe {
            let mut port = Port::new(0xf4);
            port.write(exit_code as u32);
        }
    }
}

/// Trait for types that can be run as tests.
pub trait Testable {
    /// Run the test and report results.
    fn run(&self);
}

impl<T: Fn()> Testable for T {
    fn run(&self) {
        serial_println!("test {} ... ", core::any::type_name::<T>());
        self();
        serial_println!("[ok]");
    }
}

/// Runs every test and exits QEMU with success if none panicked.
pub fn test_runner(tests: &[&dyn Testable]) {
    serial_println!("Running {} tests", tests.len());
    for test in tests {
        test.run();
    }
    exit_qemu(QemuExitCode::Success);
}

/// Panic handler for test binaries: report and exit QEMU with failure.
pub fn test_panic_handler(info: &core::panic::PanicInfo) -> ! {
    serial_println!("[failed]");
    serial_println!("Error: {}", info);
    exit_qemu(QemuExitCode::Failed);
    crate::arch::x86_64::halt_loop()
}
