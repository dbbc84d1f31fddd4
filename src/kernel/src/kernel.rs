//! The kernel object.
//!
//! Owns every device, brings them up in a fixed order, then mounts the root
//! filesystem and runs the runtime probe on the console.

use crate::boot::{self, Status};
use crate::bringup::{BringUpError, Sequencer};
use crate::config::{Options, SCREEN_DEVICE};
use crate::devices::{DeviceNameService, SharedCharDevice};
use crate::drivers::{
    Console, InterruptSystem, Ps2Keyboard, Screen, SerialDevice, SystemTimer, UsbHost,
    SERIAL_DEVICE,
};
use crate::fatal;
use crate::fs::{read_all, FsError, Volume};
use crate::logger;
use crate::mount::{mount_partition, MountError};
use crate::probe::{self, KernelHeap, ProbeSettings, Quota};
use crate::stdio::Stdio;
use crate::storage::StorageController;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use probeos_common::ShutdownMode;
use probeos_hal::{Device, DeviceError, Timer};
use spin::Mutex;

/// Build date recorded by the build script.
pub const BUILD_DATE: &str = env!("PROBEOS_BUILD_DATE");

/// Build time recorded by the build script.
pub const BUILD_TIME: &str = env!("PROBEOS_BUILD_TIME");

const TARGET: &str = "kernel";

/// Every device the kernel drives, plus the root filesystem.
pub struct Kernel {
    options: Options,
    devices: DeviceNameService,
    interrupts: InterruptSystem,
    screen: Arc<Mutex<Screen>>,
    serial: Arc<Mutex<SerialDevice>>,
    timer: SystemTimer,
    usb: UsbHost,
    console: Arc<Mutex<Console<Ps2Keyboard>>>,
    volume: Volume,
}

impl Kernel {
    /// Create the kernel. No hardware is touched until [`initialize`].
    ///
    /// [`initialize`]: Kernel::initialize
    pub fn new(options: Options) -> Self {
        let screen = Arc::new(Mutex::new(Screen::new(options.width, options.height)));
        let echo: SharedCharDevice = screen.clone();
        Self {
            serial: Arc::new(Mutex::new(SerialDevice::new(options.baud))),
            console: Arc::new(Mutex::new(Console::new(Ps2Keyboard::default(), echo))),
            screen,
            options,
            devices: DeviceNameService::new(),
            interrupts: InterruptSystem::new(),
            timer: SystemTimer::new(),
            usb: UsbHost::new(),
            volume: Volume::new(),
        }
    }

    /// Bring up every device in order, stopping at the first failure.
    pub fn initialize(&mut self) -> Result<(), BringUpError> {
        let options = &self.options;
        let devices = &self.devices;
        let screen = &self.screen;
        let serial = &self.serial;
        let console = &self.console;
        let mut storage = StorageController::new(devices, options.ramdisk_kib);

        Sequencer::new()
            .device(&mut self.interrupts)
            .step("screen", || {
                screen.lock().initialize()?;
                devices.add_char(SCREEN_DEVICE, screen.clone());
                Ok(())
            })
            .step("serial", || {
                serial.lock().initialize()?;
                devices.add_char(SERIAL_DEVICE, serial.clone());
                Ok(())
            })
            .step("logger", || {
                let fallback: SharedCharDevice = screen.clone();
                let target = logger::select_target(devices, &options.log_device, &fallback);
                logger::init(target, options.log_level)
            })
            .device(&mut self.timer)
            .device(&mut storage)
            .device(&mut self.usb)
            .step("console", || console.lock().initialize())
            .run(report_step)
    }

    /// Run the probe session on the console and time it.
    ///
    /// Missing or unmountable storage and an unwritable output file stop
    /// the kernel.
    pub fn run(&mut self) -> ShutdownMode {
        log::info!(target: TARGET, "Compile time: {} {}", BUILD_DATE, BUILD_TIME);
        log::info!(target: TARGET, "Runtime library probe");
        log::debug!(target: TARGET, "devices: {}", self.devices.names().join(" "));

        let started = self.timer.current_ticks();
        let console: SharedCharDevice = self.console.clone();
        let mode = match probe_session(&self.devices, &self.volume, console, &self.options) {
            Ok(mode) => mode,
            Err(err) => fatal!("{}", err),
        };
        let elapsed = self.timer.current_ticks().saturating_sub(started);
        log::info!(
            target: TARGET,
            "Runtime library probe finished in {} ms",
            elapsed * 1000 / u64::from(self.timer.ticks_per_second())
        );
        mode
    }
}

/// Why a probe session could not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The root filesystem could not be mounted.
    Mount(MountError),
    /// The output file could not be created or written.
    Output {
        /// Output file name.
        file: String,
        /// Filesystem error.
        error: FsError,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Mount(err) => write!(f, "{}", err),
            SessionError::Output { file, error } => write!(f, "Cannot write {}: {}", file, error),
        }
    }
}

/// Mount `options.partition` on `volume`, run the probe over `console`,
/// then unmount.
///
/// The volume is unmounted on every path that mounted it.
pub fn probe_session(
    devices: &DeviceNameService,
    volume: &Volume,
    console: SharedCharDevice,
    options: &Options,
) -> Result<ShutdownMode, SessionError> {
    mount_partition(devices, volume, &options.partition).map_err(SessionError::Mount)?;

    let settings = ProbeSettings {
        output_file: &options.output_file,
        block_len: options.block_len,
    };
    let stdio = Stdio::new(volume, console);
    let outcome = match options.quota {
        Some(bytes) => probe::run(&stdio, &mut Quota::new(KernelHeap, bytes), &settings),
        None => probe::run(&stdio, &mut KernelHeap, &settings),
    };

    if let Ok(report) = &outcome {
        log::debug!(
            target: TARGET,
            "{} blocks held before allocation failed, {} tracked instances live",
            report.exhaustion.blocks,
            report.counter.live()
        );
        match read_all(volume, settings.output_file) {
            Ok(data) => log::info!(
                target: TARGET,
                "{} holds {} bytes",
                settings.output_file,
                data.len()
            ),
            Err(err) => log::warn!(
                target: TARGET,
                "cannot read back {}: {}",
                settings.output_file,
                err
            ),
        }
    }

    if let Err(err) = volume.unmount() {
        log::error!(target: TARGET, "Cannot unmount {}: {}", options.partition, err);
    }

    outcome.map_err(|error| SessionError::Output {
        file: options.output_file.clone(),
        error,
    })?;
    Ok(ShutdownMode::Halt)
}

fn report_step(name: &'static str, result: &Result<(), DeviceError>) {
    match result {
        Ok(()) => boot::log(Status::Ok, &format!("{} initialized", name)),
        Err(err) => boot::log(Status::Fail, &format!("{}: {}", name, err)),
    }
}
