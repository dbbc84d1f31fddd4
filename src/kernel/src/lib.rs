//! ProbeOS kernel
//!
//! A small x86_64 kernel that brings up its devices, mounts a RAM-backed
//! root filesystem and runs a probe over the runtime library: collections,
//! error propagation, buffered file output, console input and heap
//! exhaustion with full cleanup.
//!
//! # Architecture
//!
//! - `arch`: descriptor tables, interrupts, PIC, PIT, PCI, VGA and serial
//! - `drivers`: devices brought up at boot
//! - `bringup`, `kernel`: ordered initialization and the run sequence
//! - `devices`, `storage`, `fs`, `mount`: device registry and root volume
//! - `stdio`, `probe`: console I/O and the runtime probe
//!
//! # Safety
//!
//! This is a `#![no_std]` kernel. All unsafe code is documented with safety
//! invariants explaining why the usage is correct.

#![no_std]
#![feature(abi_x86_interrupt)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod allocator;
pub mod arch;
pub mod boot;
pub mod bringup;
pub mod config;
pub mod devices;
pub mod drivers;
pub mod fs;
pub mod kernel;
pub mod logger;
pub mod memory;
pub mod mount;
pub mod probe;
pub mod stdio;
pub mod storage;
pub mod testutil;

/// Brings up the early serial console used before the logger exists.
///
/// Called first thing in the boot process so panics are visible even if
/// device bring-up fails. The screen sets itself up on first output.
pub fn init() {
    #[cfg(target_arch = "x86_64")]
    arch::x86_64::serial::init();
}
