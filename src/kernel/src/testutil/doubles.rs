//! Host-side stand-ins for kernel devices.

use crate::fs::{FileHandle, FileSystem, FsError, OpenFlags};
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};
use probeos_hal::CharDevice;
use spin::Mutex;

/// Console that replays scripted input and records output.
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: String,
}

impl ScriptedConsole {
    /// Console whose input is `input`, followed by end of input.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.bytes().collect(),
            output: String::new(),
        }
    }

    /// Shareable console, as the device name service hands them out.
    pub fn shared(input: &str) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(input)))
    }

    /// Everything written so far.
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl CharDevice for ScriptedConsole {
    fn write_str(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }
}

/// Filesystem that passes through to `inner` until its write budget runs
/// out, then fails every write with [`FsError::NoSpace`].
pub struct FailingWrites<'a> {
    inner: &'a dyn FileSystem,
    writes_left: AtomicUsize,
    closes: AtomicUsize,
}

impl<'a> FailingWrites<'a> {
    /// Allow `writes` successful writes to `inner`.
    pub fn new(inner: &'a dyn FileSystem, writes: usize) -> Self {
        Self {
            inner,
            writes_left: AtomicUsize::new(writes),
            closes: AtomicUsize::new(0),
        }
    }

    /// Number of close calls seen.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::Relaxed)
    }
}

impl FileSystem for FailingWrites<'_> {
    fn open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle, FsError> {
        self.inner.open(path, flags)
    }

    fn read(&self, handle: FileHandle, buffer: &mut [u8], offset: usize) -> Result<usize, FsError> {
        self.inner.read(handle, buffer, offset)
    }

    fn write(&self, handle: FileHandle, data: &[u8]) -> Result<usize, FsError> {
        self.writes_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .map_err(|_| FsError::NoSpace)?;
        self.inner.write(handle, data)
    }

    fn size(&self, handle: FileHandle) -> Result<usize, FsError> {
        self.inner.size(handle)
    }

    fn close(&self, handle: FileHandle) -> Result<(), FsError> {
        self.closes.fetch_add(1, Ordering::Relaxed);
        self.inner.close(handle)
    }
}
