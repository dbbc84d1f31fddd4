//! Filesystem handle and open-mode types.

use bitflags::bitflags;

/// A handle to an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileHandle(pub u32);

bitflags! {
    /// How a file is opened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct OpenFlags: u32 {
        const READ      = 1 << 0;
        const WRITE     = 1 << 1;
        const CREATE    = 1 << 2; // Create the file if missing
        const TRUNCATE  = 1 << 3; // Discard existing content
        const APPEND    = 1 << 4;
    }
}

impl OpenFlags {
    /// Write-only, created if missing, existing content discarded.
    pub const fn write_truncate() -> Self {
        OpenFlags::WRITE
            .union(OpenFlags::CREATE)
            .union(OpenFlags::TRUNCATE)
    }
}
