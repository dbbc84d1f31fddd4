//! PS/2 keyboard input.
//!
//! The keyboard interrupt handler pushes raw scancodes into a bounded queue;
//! readers pop and decode them with a US-104 layout. Control-letter chords
//! decode to their ASCII control characters, so Ctrl-D arrives as `'\x04'`.

use crossbeam_queue::ArrayQueue;
use pc_keyboard::{layouts, DecodedKey, HandleControl, Keyboard, ScancodeSet1};
use spin::Once;

/// Scancodes buffered between interrupts and the reader.
const QUEUE_CAPACITY: usize = 100;

static SCANCODE_QUEUE: Once<ArrayQueue<u8>> = Once::new();

/// Create the scancode queue. Idempotent.
pub fn init() {
    SCANCODE_QUEUE.call_once(|| ArrayQueue::new(QUEUE_CAPACITY));
}

/// Called by the keyboard interrupt handler.
///
/// Scancodes arriving before [`init`] or while the queue is full are
/// dropped; nothing may allocate or log in interrupt context.
pub fn add_scancode(scancode: u8) {
    if let Some(queue) = SCANCODE_QUEUE.get() {
        let _ = queue.push(scancode);
    }
}

/// Next buffered scancode, if any.
pub fn pop_scancode() -> Option<u8> {
    SCANCODE_QUEUE.get().and_then(|queue| queue.pop())
}

/// Scancode set 1 decoder for a US-104 keyboard.
pub struct Decoder {
    keyboard: Keyboard<layouts::Us104Key, ScancodeSet1>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a decoder with no modifiers held.
    pub fn new() -> Self {
        Self {
            keyboard: Keyboard::new(
                ScancodeSet1::new(),
                layouts::Us104Key,
                HandleControl::MapLettersToUnicode,
            ),
        }
    }

    /// Feed one scancode; returns a character once a key press completes.
    ///
    /// Releases, modifiers and keys without a character produce `None`.
    pub fn decode(&mut self, scancode: u8) -> Option<char> {
        let event = self.keyboard.add_byte(scancode).ok().flatten()?;
        match self.keyboard.process_keyevent(event)? {
            DecodedKey::Unicode(c) => Some(c),
            DecodedKey::RawKey(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn decode_all(decoder: &mut Decoder, scancodes: &[u8]) -> String {
        scancodes
            .iter()
            .filter_map(|&scancode| decoder.decode(scancode))
            .collect()
    }

    #[test]
    fn test_decode_letters_and_enter() {
        let mut decoder = Decoder::new();
        // h, i (press and release), enter
        let text = decode_all(&mut decoder, &[0x23, 0xA3, 0x17, 0x97, 0x1C, 0x9C]);
        assert_eq!(text, "hi\n");
    }

    #[test]
    fn test_decode_shift_and_backspace() {
        let mut decoder = Decoder::new();
        // left shift down, a, left shift up, backspace
        let text = decode_all(&mut decoder, &[0x2A, 0x1E, 0x9E, 0xAA, 0x0E, 0x8E]);
        assert_eq!(text, "A\x08");
    }

    #[test]
    fn test_decode_ctrl_d() {
        let mut decoder = Decoder::new();
        // left control down, d, left control up
        let text = decode_all(&mut decoder, &[0x1D, 0x20, 0xA0, 0x9D]);
        assert_eq!(text, "\x04");
    }
}
