//! Boot progress lines with colored status brackets.

pub mod banner;

use crate::arch::x86_64::vga::{self, Color};
use crate::{print, println, serial_println};

/// Outcome shown in a boot line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `[ OK ]` in green.
    Ok,
    /// `[FAIL]` in red.
    Fail,
    /// `[WARN]` in yellow.
    Warn,
    /// `[INFO]` in cyan.
    Info,
}

impl Status {
    fn label(self) -> (&'static str, Color) {
        match self {
            Status::Ok => ("[ OK ]", Color::LightGreen),
            Status::Fail => ("[FAIL]", Color::LightRed),
            Status::Warn => ("[WARN]", Color::Yellow),
            Status::Info => ("[INFO]", Color::LightCyan),
        }
    }
}

/// Print `[ OK ] message` on the screen, mirrored to serial.
pub fn log(status: Status, message: &str) {
    let (text, color) = status.label();
    vga::set_color(color, Color::Black);
    print!("{}", text);
    vga::set_color(Color::White, Color::Black);
    println!(" {}", message);
    serial_println!("{} {}", text, message);
}
