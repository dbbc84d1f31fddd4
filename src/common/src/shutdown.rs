//! Terminal dispositions returned by the kernel's run loop.

/// What the entry point does after the kernel returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Stop the CPU.
    Halt,
    /// Reset the machine.
    Reboot,
}
