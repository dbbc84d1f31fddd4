//! Standard I/O on top of the mounted filesystem and the console.
//!
//! [`Stdio`] is created once the root filesystem is mounted. It routes
//! standard output, standard error and standard input to the console and
//! opens files on the root volume.

use crate::devices::SharedCharDevice;
use crate::fs::{FileHandle, FileSystem, FsError, OpenFlags};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Buffered bytes that trigger a flush to the filesystem.
const FLUSH_THRESHOLD: usize = 512;

/// Standard I/O context.
pub struct Stdio<'a> {
    fs: &'a dyn FileSystem,
    console: SharedCharDevice,
}

impl<'a> Stdio<'a> {
    /// Wire `fs` as the root for file operations and `console` as the
    /// character device behind standard input, output and error.
    pub fn new(fs: &'a dyn FileSystem, console: SharedCharDevice) -> Self {
        Self { fs, console }
    }

    /// Writer for standard output.
    pub fn stdout(&self) -> ConsoleWriter {
        ConsoleWriter {
            device: self.console.clone(),
        }
    }

    /// Writer for standard error.
    pub fn stderr(&self) -> ConsoleWriter {
        ConsoleWriter {
            device: self.console.clone(),
        }
    }

    /// Read one line from standard input, without its terminator.
    ///
    /// Blocks until a newline arrives. Returns `None` if input ends before
    /// any byte was read.
    pub fn read_line(&self) -> Option<String> {
        let mut bytes = Vec::new();
        let mut saw_input = false;
        loop {
            // Lock per byte; echoing takes the screen lock.
            let byte = self.console.lock().read_byte();
            match byte {
                Some(b'\n') => break,
                Some(b'\r') => saw_input = true,
                Some(byte) => {
                    saw_input = true;
                    bytes.push(byte);
                }
                None if saw_input => break,
                None => return None,
            }
        }
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Open `path` for writing, discarding any existing content.
    pub fn create(&self, path: &str) -> Result<OutputFile<'a>, FsError> {
        let handle = self.fs.open(path, OpenFlags::write_truncate())?;
        Ok(OutputFile {
            fs: self.fs,
            handle: Some(handle),
            buffer: Vec::new(),
        })
    }
}

/// A [`fmt::Write`] sink on the console.
#[derive(Clone)]
pub struct ConsoleWriter {
    device: SharedCharDevice,
}

impl fmt::Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.device.lock().write_str(s);
        Ok(())
    }
}

/// Prints a line to standard output of a [`Stdio`].
#[macro_export]
macro_rules! outln {
    ($stdio:expr) => ($crate::outln!($stdio, ""));
    ($stdio:expr, $($arg:tt)*) => {{
        use core::fmt::Write as _;
        let _ = writeln!($stdio.stdout(), $($arg)*);
    }};
}

/// Prints a line to standard error of a [`Stdio`].
#[macro_export]
macro_rules! errln {
    ($stdio:expr, $($arg:tt)*) => {{
        use core::fmt::Write as _;
        let _ = writeln!($stdio.stderr(), $($arg)*);
    }};
}

/// Buffered output file.
///
/// The file is closed exactly once: by [`OutputFile::close`], or on drop
/// if it was never closed explicitly.
pub struct OutputFile<'a> {
    fs: &'a dyn FileSystem,
    handle: Option<FileHandle>,
    buffer: Vec<u8>,
}

impl OutputFile<'_> {
    /// Buffer `s`, flushing once enough has accumulated.
    pub fn write_str(&mut self, s: &str) -> Result<(), FsError> {
        if self.handle.is_none() {
            return Err(FsError::InvalidHandle);
        }
        self.buffer.extend_from_slice(s.as_bytes());
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush()?;
        }
        Ok(())
    }

    /// Write `line` and a newline, then flush.
    pub fn write_line(&mut self, line: &str) -> Result<(), FsError> {
        self.write_str(line)?;
        self.write_str("\n")?;
        self.flush()
    }

    /// Push buffered bytes to the filesystem.
    pub fn flush(&mut self) -> Result<(), FsError> {
        let handle = self.handle.ok_or(FsError::InvalidHandle)?;
        if !self.buffer.is_empty() {
            self.fs.write(handle, &self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    /// Flush and close the file.
    pub fn close(mut self) -> Result<(), FsError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), FsError> {
        let flushed = self.flush();
        let handle = self.handle.take().ok_or(FsError::InvalidHandle)?;
        let closed = self.fs.close(handle);
        flushed.and(closed)
    }
}

impl Drop for OutputFile<'_> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(err) = self.finish() {
                log::warn!(target: "stdio", "closing file on drop failed: {}", err);
            }
        }
    }
}
