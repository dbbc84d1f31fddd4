//! Filesystem Traits and Types.

use alloc::vec::Vec;

pub use probeos_common::fs::{FileHandle, OpenFlags};
pub use probeos_common::FsError;

pub mod volume;

pub use volume::Volume;

/// Trait for a filesystem.
pub trait FileSystem {
    /// Open a file by path.
    fn open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle, FsError>;

    /// Read from an open file.
    fn read(&self, handle: FileHandle, buffer: &mut [u8], offset: usize) -> Result<usize, FsError>;

    /// Write to an open file at its current position.
    fn write(&self, handle: FileHandle, data: &[u8]) -> Result<usize, FsError>;

    /// Get file size.
    fn size(&self, handle: FileHandle) -> Result<usize, FsError>;

    /// Close a file handle.
    fn close(&self, handle: FileHandle) -> Result<(), FsError>;
}

/// Read a whole file.
pub fn read_all(fs: &dyn FileSystem, path: &str) -> Result<Vec<u8>, FsError> {
    let handle = fs.open(path, OpenFlags::READ)?;
    let result = fs.size(handle).and_then(|size| {
        let mut content = alloc::vec![0; size];
        let mut done = 0;
        while done < size {
            match fs.read(handle, &mut content[done..], done)? {
                0 => break,
                n => done += n,
            }
        }
        content.truncate(done);
        Ok(content)
    });
    fs.close(handle)?;
    result
}
