//! VGA text mode output.
//!
//! The screen is a grid of 16-bit cells: glyph in the low byte, attribute
//! in the high byte. Text is always written on the bottom row and the grid
//! scrolls up on newline or when a row fills.

use core::fmt;
use core::ptr;
use spin::Mutex;

/// Text mode geometry as `(columns, rows)`.
pub const TEXT_MODE: (usize, usize) = (80, 25);

const VGA_BUFFER_ADDR: usize = 0xB8000;

/// Shown in place of bytes the code page cannot display as text.
const PLACEHOLDER: u8 = 0xfe;

/// Colors of the text mode palette used by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    /// Background of every line.
    Black = 0,
    /// Banner.
    Cyan = 3,
    /// Successful boot steps.
    LightGreen = 10,
    /// Informational boot lines.
    LightCyan = 11,
    /// Failures and panics.
    LightRed = 12,
    /// Warnings.
    Yellow = 14,
    /// Ordinary text.
    White = 15,
}

fn attribute(foreground: Color, background: Color) -> u8 {
    (background as u8) << 4 | foreground as u8
}

fn cell(glyph: u8, attribute: u8) -> u16 {
    u16::from(attribute) << 8 | u16::from(glyph)
}

/// Storage for screen cells, indexed row-major.
pub trait Cells {
    /// Reads cell `index`.
    fn read(&self, index: usize) -> u16;
    /// Writes cell `index`.
    fn write(&mut self, index: usize, value: u16);
}

/// The memory-mapped text buffer at 0xB8000.
pub struct VgaMemory {
    base: *mut u16,
    len: usize,
}

// SAFETY: The buffer is only touched through the WRITER lock.
unsafe impl Send for VgaMemory {}

impl VgaMemory {
    fn new(columns: usize, rows: usize) -> Self {
        Self {
            base: VGA_BUFFER_ADDR as *mut u16,
            len: columns * rows,
        }
    }
}

impl Cells for VgaMemory {
    fn read(&self, index: usize) -> u16 {
        debug_assert!(index < self.len);
        // SAFETY: The text buffer is identity mapped and spans `len` cells.
        // Volatile because the adapter reads it concurrently.
        unsafe { ptr::read_volatile(self.base.add(index)) }
    }

    fn write(&mut self, index: usize, value: u16) {
        debug_assert!(index < self.len);
        // SAFETY: As in `read`.
        unsafe { ptr::write_volatile(self.base.add(index), value) }
    }
}

/// Cursor and color state over a grid of cells.
pub struct Writer<C> {
    cells: C,
    columns: usize,
    rows: usize,
    column: usize,
    attribute: u8,
}

impl<C: Cells> Writer<C> {
    /// Writer over a `columns` by `rows` grid.
    pub fn new(cells: C, columns: usize, rows: usize) -> Self {
        Self {
            cells,
            columns,
            rows,
            column: 0,
            attribute: attribute(Color::White, Color::Black),
        }
    }

    /// Colors for subsequent output.
    pub fn set_color(&mut self, foreground: Color, background: Color) {
        self.attribute = attribute(foreground, background);
    }

    fn bottom(&self, column: usize) -> usize {
        (self.rows - 1) * self.columns + column
    }

    fn blank(&self) -> u16 {
        cell(b' ', self.attribute)
    }

    /// Writes one byte, interpreting newline and backspace.
    pub fn put(&mut self, byte: u8) {
        match byte {
            b'\n' => self.scroll(),
            b'\r' => {}
            0x08 => self.backspace(),
            0x20..=0x7e => self.glyph(byte),
            _ => self.glyph(PLACEHOLDER),
        }
    }

    fn glyph(&mut self, byte: u8) {
        if self.column == self.columns {
            self.scroll();
        }
        let index = self.bottom(self.column);
        self.cells.write(index, cell(byte, self.attribute));
        self.column += 1;
    }

    /// Erases the character left of the cursor, staying on this row.
    pub fn backspace(&mut self) {
        if self.column > 0 {
            self.column -= 1;
            let index = self.bottom(self.column);
            let blank = self.blank();
            self.cells.write(index, blank);
        }
    }

    fn scroll(&mut self) {
        for index in self.columns..self.rows * self.columns {
            let value = self.cells.read(index);
            self.cells.write(index - self.columns, value);
        }
        let blank = self.blank();
        for column in 0..self.columns {
            let index = self.bottom(column);
            self.cells.write(index, blank);
        }
        self.column = 0;
    }

    /// Blanks every cell and moves the cursor to the start of the row.
    pub fn clear(&mut self) {
        let blank = self.blank();
        for index in 0..self.rows * self.columns {
            self.cells.write(index, blank);
        }
        self.column = 0;
    }
}

impl<C: Cells> fmt::Write for Writer<C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        s.bytes().for_each(|byte| self.put(byte));
        Ok(())
    }
}

/// The screen writer, created on first use.
pub static WRITER: spin::Once<Mutex<Writer<VgaMemory>>> = spin::Once::new();

/// Sets up the writer for a `columns` by `rows` text mode.
///
/// Only the first call has an effect.
pub fn init(columns: usize, rows: usize) -> &'static Mutex<Writer<VgaMemory>> {
    WRITER.call_once(|| Mutex::new(Writer::new(VgaMemory::new(columns, rows), columns, rows)))
}

fn writer() -> &'static Mutex<Writer<VgaMemory>> {
    let (columns, rows) = TEXT_MODE;
    init(columns, rows)
}

/// Prints to the VGA buffer without a newline.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::arch::x86_64::vga::_print(format_args!($($arg)*))
    };
}

/// Prints to the VGA buffer with a newline.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)))
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    let _ = fmt::Write::write_fmt(&mut *writer().lock(), args);
}

/// Writes `s` to the screen.
pub fn write_str(s: &str) {
    let mut writer = writer().lock();
    s.bytes().for_each(|byte| writer.put(byte));
}

/// Sets the VGA output color.
pub fn set_color(foreground: Color, background: Color) {
    writer().lock().set_color(foreground, background);
}

/// Clears the VGA screen.
pub fn clear_screen() {
    writer().lock().clear();
}
