//! Kernel logger.
//!
//! Routes the `log` facade to a character device chosen at bring-up: the
//! device named by the `logdev` option if it is registered, otherwise the
//! screen.

use crate::devices::{DeviceNameService, SharedCharDevice};
use core::fmt::{self, Write};
use log::{Level, LevelFilter, Log, Metadata, Record};
use probeos_hal::{CharDevice, DeviceError};
use spin::Once;

/// Logger writing `<level> <target>: <message>` lines to its device.
///
/// Filtering is left to `log::max_level`.
pub struct KernelLogger {
    target: Once<SharedCharDevice>,
}

static LOGGER: KernelLogger = KernelLogger::new();

impl KernelLogger {
    const fn new() -> Self {
        Self {
            target: Once::new(),
        }
    }
}

struct DeviceWriter<'a>(&'a mut (dyn CharDevice + Send));

impl Write for DeviceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

impl Log for KernelLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(target) = self.target.get() else {
            return;
        };
        let tag = match record.level() {
            Level::Error => "!",
            Level::Warn => "*",
            Level::Info => " ",
            Level::Debug => "d",
            Level::Trace => "t",
        };
        let mut device = target.lock();
        let _ = writeln!(
            DeviceWriter(&mut *device),
            "{} {}: {}",
            tag,
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Pick the log device: `name` if registered, else `fallback`.
pub fn select_target(
    devices: &DeviceNameService,
    name: &str,
    fallback: &SharedCharDevice,
) -> SharedCharDevice {
    devices.get_char(name).unwrap_or_else(|| fallback.clone())
}

/// Install the kernel logger on `target` with maximum level `level`.
///
/// Fails if a logger is already installed.
pub fn init(target: SharedCharDevice, level: LevelFilter) -> Result<(), DeviceError> {
    if LOGGER.target.get().is_some() {
        return Err(DeviceError::AlreadyInitialized);
    }
    LOGGER.target.call_once(|| target);
    log::set_logger(&LOGGER).map_err(|_| DeviceError::AlreadyInitialized)?;
    log::set_max_level(level);
    Ok(())
}

/// Log an unrecoverable condition and stop the kernel.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {{
        log::error!($($arg)+);
        panic!($($arg)+)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::doubles::ScriptedConsole;
    use alloc::sync::Arc;
    use spin::Mutex;

    #[test]
    fn test_select_named_device() {
        let devices = DeviceNameService::new();
        let serial = ScriptedConsole::shared("");
        let screen = ScriptedConsole::shared("");
        devices.add_char("ttyS1", serial.clone());
        let fallback: SharedCharDevice = screen.clone();

        let chosen = select_target(&devices, "ttyS1", &fallback);
        chosen.lock().write_str("x");

        assert_eq!(serial.lock().output(), "x");
        assert_eq!(screen.lock().output(), "");
    }

    #[test]
    fn test_select_falls_back_to_screen() {
        let devices = DeviceNameService::new();
        let screen = ScriptedConsole::shared("");
        let fallback: SharedCharDevice = screen.clone();

        let chosen = select_target(&devices, "ttyS9", &fallback);

        assert!(Arc::ptr_eq(&chosen, &fallback));
    }

    #[test]
    fn test_format_line() {
        let console = Arc::new(Mutex::new(ScriptedConsole::new("")));
        let device: SharedCharDevice = console.clone();
        let logger = KernelLogger::new();
        logger.target.call_once(|| device);

        logger.log(
            &Record::builder()
                .level(Level::Error)
                .target("kernel")
                .args(format_args!("Partition not found: {}", "emmc1-1"))
                .build(),
        );

        assert_eq!(console.lock().output(), "! kernel: Partition not found: emmc1-1\n");
    }
}
