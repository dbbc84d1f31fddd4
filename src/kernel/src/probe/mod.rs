//! Runtime exercise probe.
//!
//! Runs a fixed script over the runtime library once the root filesystem and
//! console are available: collections, error propagation, buffered file
//! output, a blocking line read, and heap exhaustion with full cleanup.

pub mod exhaust;
pub mod tracked;

pub use exhaust::{exhaust, AllocError, Block, BlockAllocator, Exhaustion, KernelHeap, Quota};
pub use tracked::{LiveCounter, Tracked};

use crate::fs::FsError;
use crate::stdio::Stdio;
use crate::{errln, outln};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

/// First line written after the error round trip.
pub const MARKER_LINE: &str = "lorem ipsum";

/// Entries written to the output file, in order.
pub const ENTRIES: [&str; 2] = ["vector entry 1", "vector entry 2"];

/// Printed by the live counter when the last tracked instance is dropped.
pub const CLEANUP_MESSAGE: &str = "all tracked instances cleaned up...";

/// The error `barf` always fails with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ooops;

impl fmt::Display for Ooops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ooops!")
    }
}

/// Always fails with [`Ooops`].
pub fn barf(stdio: &Stdio<'_>) -> Result<(), Ooops> {
    errln!(stdio, "Throwing exception...");
    Err(Ooops)
}

/// Probe parameters.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings<'a> {
    /// File written in the root of the mounted volume.
    pub output_file: &'a str,
    /// Tracked values per block in the exhaustion check.
    pub block_len: usize,
}

/// What the probe observed.
pub struct ProbeReport {
    /// The line read from standard input.
    pub line: String,
    /// Outcome of the exhaustion check.
    pub exhaustion: Exhaustion,
    /// Counter shared by every tracked value the probe created.
    pub counter: Arc<LiveCounter>,
}

/// Run the probe.
///
/// Only a failure to create or write the output file is returned; the
/// probe's own error and allocation failures are handled here. The output
/// file is closed exactly once on every path.
pub fn run<A: BlockAllocator>(
    stdio: &Stdio<'_>,
    allocator: &mut A,
    settings: &ProbeSettings<'_>,
) -> Result<ProbeReport, FsError> {
    let entries: Vec<String> = ENTRIES.iter().map(|entry| String::from(*entry)).collect();

    outln!(stdio, "Opening file {}...", settings.output_file);
    let mut file = stdio.create(settings.output_file)?;

    if let Err(err) = barf(stdio) {
        errln!(stdio, "Caught exception...");
        file.write_line(MARKER_LINE)?;
        file.write_line(&alloc::format!("{}", err))?;
    }

    outln!(stdio, "Use iterators...");
    entries.iter().try_for_each(|entry| file.write_line(entry))?;

    outln!(stdio, "Type some characters and hit <RETURN>");
    let line = stdio.read_line().unwrap_or_default();
    outln!(stdio, "Read '{}' from console...", line);

    let out = stdio.stdout();
    let counter = LiveCounter::new(move || {
        use core::fmt::Write as _;
        let _ = writeln!(out.clone(), "{}", CLEANUP_MESSAGE);
    });
    let exhaustion = exhaust(allocator, &counter, settings.block_len, stdio);

    file.close()?;

    Ok(ProbeReport {
        line,
        exhaustion,
        counter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{read_all, Volume};
    use crate::storage::{RamDisk, BLOCK_SIZE};
    use crate::testutil::doubles::{FailingWrites, ScriptedConsole};
    use core::mem::size_of;
    use spin::Mutex;

    const EXPECTED_FILE: &[u8] = b"lorem ipsum\nOoops!\nvector entry 1\nvector entry 2\n";

    fn mounted() -> Volume {
        let volume = Volume::new();
        volume
            .mount(Arc::new(Mutex::new(RamDisk::new(BLOCK_SIZE, 16))))
            .unwrap();
        volume
    }

    /// Quota bytes for one retained block of `len` values.
    fn block_bytes(len: usize) -> usize {
        len * size_of::<Tracked>() + size_of::<Block>()
    }

    fn settings() -> ProbeSettings<'static> {
        ProbeSettings {
            output_file: "test.txt",
            block_len: 500,
        }
    }

    #[test]
    fn test_barf_always_fails_with_ooops() {
        let volume = Volume::new();
        let console = ScriptedConsole::shared("");
        let stdio = Stdio::new(&volume, console.clone());

        for _ in 0..3 {
            let err = barf(&stdio).unwrap_err();
            assert_eq!(err, Ooops);
            assert_eq!(alloc::format!("{}", err), "Ooops!");
        }
        assert_eq!(console.lock().output().matches("Throwing exception...").count(), 3);
    }

    #[test]
    fn test_run_writes_exact_file() {
        let volume = mounted();
        let console = ScriptedConsole::shared("hello probe\n");
        let stdio = Stdio::new(&volume, console.clone());
        let mut quota = Quota::new(KernelHeap, 4 * block_bytes(500));

        let report = run(&stdio, &mut quota, &settings()).unwrap();

        assert_eq!(read_all(&volume, "test.txt").unwrap(), EXPECTED_FILE);
        assert_eq!(volume.open_handles(), 0);
        assert_eq!(report.line, "hello probe");
        assert_eq!(report.exhaustion.blocks, 4);
        assert_eq!(report.counter.live(), 0);
        assert_eq!(report.counter.zero_crossings(), 1);
    }

    #[test]
    fn test_run_console_transcript() {
        let volume = mounted();
        let console = ScriptedConsole::shared("abc\n");
        let stdio = Stdio::new(&volume, console.clone());
        let mut quota = Quota::new(KernelHeap, block_bytes(500));

        run(&stdio, &mut quota, &settings()).unwrap();

        let console = console.lock();
        let output = console.output();
        let order = [
            "Opening file test.txt...",
            "Throwing exception...",
            "Caught exception...",
            "Use iterators...",
            "Type some characters and hit <RETURN>",
            "Read 'abc' from console...",
            "Allocated block at",
            CLEANUP_MESSAGE,
            "allocation failure caught:",
        ];
        let mut from = 0;
        for needle in order {
            let at = output[from..]
                .find(needle)
                .unwrap_or_else(|| panic!("missing or out of order: {}", needle));
            from += at + needle.len();
        }
        assert_eq!(output.matches(CLEANUP_MESSAGE).count(), 1);
    }

    #[test]
    fn test_run_with_no_input_and_no_memory() {
        let volume = mounted();
        let console = ScriptedConsole::shared("");
        let stdio = Stdio::new(&volume, console.clone());

        let report = run(&stdio, &mut Quota::new(KernelHeap, 0), &settings()).unwrap();

        assert_eq!(report.line, "");
        assert_eq!(report.exhaustion.blocks, 0);
        assert_eq!(report.counter.zero_crossings(), 0);
        assert_eq!(read_all(&volume, "test.txt").unwrap(), EXPECTED_FILE);
        assert!(!console.lock().output().contains(CLEANUP_MESSAGE));
    }

    #[test]
    fn test_run_truncates_previous_output() {
        let volume = mounted();
        let stdio = Stdio::new(&volume, ScriptedConsole::shared(""));
        stdio
            .create("test.txt")
            .unwrap()
            .write_line("stale content that is longer than the new file by quite a lot of bytes")
            .unwrap();

        run(&stdio, &mut Quota::new(KernelHeap, 0), &settings()).unwrap();

        assert_eq!(read_all(&volume, "test.txt").unwrap(), EXPECTED_FILE);
    }

    #[test]
    fn test_run_fails_when_file_cannot_open() {
        let volume = Volume::new();
        let console = ScriptedConsole::shared("never read\n");
        let stdio = Stdio::new(&volume, console.clone());

        let result = run(&stdio, &mut KernelHeap, &settings());

        assert!(matches!(result, Err(FsError::NotMounted)));
        assert!(!console.lock().output().contains("Type some characters"));
    }

    #[test]
    fn test_failed_write_still_closes_file() {
        let volume = mounted();
        // The marker line lands; the error message line does not.
        let fs = FailingWrites::new(&volume, 1);
        let console = ScriptedConsole::shared("never read\n");
        let stdio = Stdio::new(&fs, console.clone());
        let mut quota = Quota::new(KernelHeap, block_bytes(500));

        let result = run(&stdio, &mut quota, &settings());

        assert!(matches!(result, Err(FsError::NoSpace)));
        assert_eq!(fs.closes(), 1);
        assert_eq!(volume.open_handles(), 0);
        assert_eq!(read_all(&volume, "test.txt").unwrap(), b"lorem ipsum\n");
        assert!(!console.lock().output().contains("Type some characters"));
    }
}
