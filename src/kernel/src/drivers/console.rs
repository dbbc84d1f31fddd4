//! Line-cooked console.
//!
//! Output goes to the screen. Input comes from a [`KeySource`] and is
//! edited a line at a time: printable characters are echoed, backspace
//! erases, and a completed line is handed to readers byte by byte. Ctrl-D
//! ends input: whatever is typed is delivered and the following read
//! reports end of input.

use crate::devices::SharedCharDevice;
use crate::drivers::keyboard::{self, Decoder};
use alloc::collections::VecDeque;
use alloc::string::String;
use probeos_hal::{CharDevice, Device, DeviceError};

/// Longest line the editor accepts; further characters are ignored.
pub const MAX_LINE_LENGTH: usize = 256;

const BACKSPACE: char = '\x08';
const DELETE: char = '\x7f';
const END_OF_INPUT: char = '\x04';

/// Source of typed characters.
pub trait KeySource {
    /// Prepare the source for reading.
    fn attach(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Next typed character, blocking until one is available.
    fn next_char(&mut self) -> char;
}

/// Keyboard fed by the PS/2 interrupt handler.
#[derive(Default)]
pub struct Ps2Keyboard {
    decoder: Decoder,
}

impl KeySource for Ps2Keyboard {
    fn attach(&mut self) -> Result<(), DeviceError> {
        keyboard::init();
        Ok(())
    }

    fn next_char(&mut self) -> char {
        loop {
            match keyboard::pop_scancode() {
                Some(scancode) => {
                    if let Some(c) = self.decoder.decode(scancode) {
                        return c;
                    }
                }
                // The keyboard or timer interrupt wakes us up.
                None => crate::arch::hlt(),
            }
        }
    }
}

/// Outcome of feeding one character to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Pending,
    Line,
    EndOfInput,
}

/// Console device over a screen and a key source.
pub struct Console<K> {
    keys: K,
    screen: SharedCharDevice,
    line: String,
    pending: VecDeque<u8>,
    end_of_input: bool,
    ready: bool,
}

impl<K: KeySource> Console<K> {
    /// Console echoing to `screen` and reading from `keys`.
    pub fn new(keys: K, screen: SharedCharDevice) -> Self {
        Self {
            keys,
            screen,
            line: String::with_capacity(MAX_LINE_LENGTH),
            pending: VecDeque::new(),
            end_of_input: false,
            ready: false,
        }
    }

    fn echo(&self, s: &str) {
        self.screen.lock().write_str(s);
    }

    fn feed(&mut self, c: char) -> Edit {
        match c {
            '\n' | '\r' => {
                self.echo("\n");
                Edit::Line
            }
            BACKSPACE | DELETE => {
                if self.line.pop().is_some() {
                    self.echo("\x08");
                }
                Edit::Pending
            }
            END_OF_INPUT => Edit::EndOfInput,
            c if c.is_ascii() && !c.is_control() => {
                if self.line.len() < MAX_LINE_LENGTH {
                    self.line.push(c);
                    let mut utf8 = [0; 4];
                    self.echo(c.encode_utf8(&mut utf8));
                }
                Edit::Pending
            }
            _ => Edit::Pending,
        }
    }

    fn cook_line(&mut self) {
        loop {
            let c = self.keys.next_char();
            match self.feed(c) {
                Edit::Pending => {}
                Edit::Line => {
                    self.pending.extend(self.line.bytes());
                    self.pending.push_back(b'\n');
                    self.line.clear();
                    return;
                }
                Edit::EndOfInput => {
                    self.pending.extend(self.line.bytes());
                    self.line.clear();
                    self.end_of_input = true;
                    return;
                }
            }
        }
    }
}

impl<K: KeySource> Device for Console<K> {
    fn name(&self) -> &'static str {
        "console"
    }

    fn initialize(&mut self) -> Result<(), DeviceError> {
        if self.ready {
            return Err(DeviceError::AlreadyInitialized);
        }
        self.keys.attach()?;
        self.ready = true;
        Ok(())
    }
}

impl<K: KeySource> CharDevice for Console<K> {
    fn write_str(&mut self, s: &str) {
        self.echo(s);
    }

    fn read_byte(&mut self) -> Option<u8> {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Some(byte);
            }
            if self.end_of_input {
                self.end_of_input = false;
                return None;
            }
            self.cook_line();
        }
    }
}
