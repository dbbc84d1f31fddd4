//! System tick from PIT channel 0.

use crate::arch::x86_64::pit;
use core::sync::atomic::{AtomicU64, Ordering};
use probeos_hal::{Device, DeviceError, Timer};

/// Tick rate the PIT is programmed to.
pub const TICKS_PER_SECOND: u32 = 100;

/// Polls allowed for the first tick before giving up.
const FIRST_TICK_POLLS: usize = 50_000_000;

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Called by the timer interrupt handler.
pub fn tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Ticks since the timer was started.
pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}

/// Poll `read` until its value changes, at most `polls` times.
fn wait_for_change(read: impl Fn() -> u64, polls: usize) -> Result<(), DeviceError> {
    let start = read();
    for _ in 0..polls {
        if read() != start {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(DeviceError::Timeout)
}

/// The periodic system timer.
#[derive(Default)]
pub struct SystemTimer {
    ready: bool,
}

impl SystemTimer {
    /// Create an uninitialized timer.
    pub fn new() -> Self {
        Self { ready: false }
    }
}

impl Device for SystemTimer {
    fn name(&self) -> &'static str {
        "timer"
    }

    /// Programs the PIT and waits for the first tick, so interrupts must
    /// already be enabled.
    fn initialize(&mut self) -> Result<(), DeviceError> {
        if self.ready {
            return Err(DeviceError::AlreadyInitialized);
        }
        if !pit::set_frequency(TICKS_PER_SECOND) {
            return Err(DeviceError::Unsupported);
        }
        wait_for_change(ticks, FIRST_TICK_POLLS)?;
        self.ready = true;
        Ok(())
    }
}

impl Timer for SystemTimer {
    fn current_ticks(&self) -> u64 {
        ticks()
    }

    fn ticks_per_second(&self) -> u32 {
        TICKS_PER_SECOND
    }
}
