//! Serial port driver for x86_64.
//!
//! Provides serial output via COM1 (0x3F8) for debugging and logging.

use core::fmt::{self, Write};
use probeos_hal::DeviceError;
use spin::Mutex;
use uart_16550::SerialPort;
use x86_64::instructions::port::Port;

/// COM1 I/O port address.
const COM1_PORT: u16 = 0x3F8;

/// UART input clock divided by 16.
const UART_BASE_BAUD: u32 = 115_200;

/// Line control register offset and its divisor latch access bit.
const LINE_CONTROL: u16 = 3;
const DLAB: u8 = 0x80;

/// Line status register offset and its data ready bit.
const LINE_STATUS: u16 = 5;
const DATA_READY: u8 = 0x01;

/// Global serial port instance, lazily initialized.
///
/// Uses a spinlock for safe concurrent access from multiple contexts,
/// including interrupt handlers.
pub static SERIAL: spin::Once<Mutex<SerialPort>> = spin::Once::new();

/// Initializes the global serial port at the UART's default rate.
///
/// This function is idempotent - calling it multiple times has no effect
/// after the first successful initialization.
pub fn init() {
    SERIAL.call_once(|| {
        // SAFETY: COM1_PORT (0x3F8) is a well-known x86 serial port address.
        // We're running in kernel mode with full I/O port access.
        // The uart_16550 crate handles the port initialization sequence correctly.
        let mut serial = unsafe { SerialPort::new(COM1_PORT) };
        serial.init();
        Mutex::new(serial)
    });
}

/// Divisor latch value for `baud`, if the UART can produce it exactly.
pub fn divisor(baud: u32) -> Option<u16> {
    if baud == 0 || UART_BASE_BAUD % baud != 0 {
        return None;
    }
    u16::try_from(UART_BASE_BAUD / baud).ok()
}

/// Reprograms COM1 to `baud`.
pub fn set_baud(baud: u32) -> Result<(), DeviceError> {
    let divisor = divisor(baud).ok_or(DeviceError::Unsupported)?;
    // Hold the port lock so no byte goes out while the latch is open.
    let _port = get_serial().lock();
    // SAFETY: These are the COM1 registers. Setting DLAB exposes the divisor
    // latch at offsets 0 and 1; the saved line control is restored after.
    unsafe {
        let mut line_control: Port<u8> = Port::new(COM1_PORT + LINE_CONTROL);
        let mut low: Port<u8> = Port::new(COM1_PORT);
        let mut high: Port<u8> = Port::new(COM1_PORT + 1);

        let saved = line_control.read();
        line_control.write(saved | DLAB);
        low.write((divisor & 0xFF) as u8);
        high.write((divisor >> 8) as u8);
        line_control.write(saved & !DLAB);
    }
    Ok(())
}

/// Returns a reference to the serial port, initializing if necessary.
fn get_serial() -> &'static Mutex<SerialPort> {
    init();
    SERIAL.get().expect("serial port not initialized")
}

/// Prints to the serial port without a newline.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::arch::x86_64::serial::_print(format_args!($($arg)*))
    };
}

/// Prints to the serial port with a newline.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)))
}

/// Internal print function used by macros.
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    let serial = get_serial();
    serial.lock().write_fmt(args).expect("serial write failed");
}

/// A wrapper to implement HAL traits for the serial port.
pub struct SerialWrapper;

impl probeos_hal::Serial for SerialWrapper {
    fn write_byte(&mut self, byte: u8) {
        get_serial().lock().send(byte);
    }

    fn read_byte(&mut self) -> Option<u8> {
        let _port = get_serial().lock();
        // SAFETY: Reading the line status and data registers of COM1 has no
        // side effect beyond consuming the received byte.
        unsafe {
            let mut status: Port<u8> = Port::new(COM1_PORT + LINE_STATUS);
            if status.read() & DATA_READY == 0 {
                return None;
            }
            let mut data: Port<u8> = Port::new(COM1_PORT);
            Some(data.read())
        }
    }
}
