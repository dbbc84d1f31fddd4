//! Device drivers brought up at boot.
//!
//! Each driver implements [`probeos_hal::Device`] so the bring-up sequencer
//! can initialize it by name.

pub mod console;
pub mod interrupt;
pub mod keyboard;
pub mod screen;
pub mod serial;
pub mod timer;
pub mod usb;

pub use console::{Console, KeySource, Ps2Keyboard};
pub use interrupt::InterruptSystem;
pub use screen::Screen;
pub use serial::{SerialDevice, SERIAL_DEVICE};
pub use timer::SystemTimer;
pub use usb::UsbHost;
