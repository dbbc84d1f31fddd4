#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(probeos_kernel::testutil::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;

use alloc::sync::Arc;
use bootloader::{entry_point, BootInfo};
use core::panic::PanicInfo;
use core::sync::atomic::{AtomicUsize, Ordering};
use probeos_hal::{BlockDevice, CharDevice, Device};
use probeos_kernel::arch::x86_64::pci;
use probeos_kernel::config::Options;
use probeos_kernel::devices::{DeviceNameService, SharedCharDevice};
use probeos_kernel::fs::{read_all, Volume};
use probeos_kernel::mount::mount_partition;
use probeos_kernel::probe::{self, exhaust, KernelHeap, LiveCounter, ProbeSettings};
use probeos_kernel::serial_print;
use probeos_kernel::stdio::Stdio;
use probeos_kernel::storage::{StorageController, PARTITION_NAME};
use probeos_kernel::{allocator, memory};
use spin::Mutex;
use x86_64::VirtAddr;

entry_point!(main);

fn main(boot_info: &'static BootInfo) -> ! {
    probeos_kernel::init();
    let phys_mem_offset = VirtAddr::new(boot_info.physical_memory_offset);
    let mut mapper = unsafe { memory::init_mapper(phys_mem_offset) };
    let mut frame_allocator = unsafe { memory::BootInfoFrameAllocator::init(&boot_info.memory_map) };
    let heap_size = allocator::heap_size_for(memory::usable_bytes(&boot_info.memory_map));
    allocator::init_heap(&mut mapper, &mut frame_allocator, heap_size)
        .expect("heap initialization failed");

    test_main();
    loop {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    probeos_kernel::testutil::test_panic_handler(info)
}

/// Console that types one line and mirrors output to serial without
/// allocating, so it keeps working while the heap is exhausted.
struct SerialConsole {
    input: &'static [u8],
    written: Arc<AtomicUsize>,
}

impl CharDevice for SerialConsole {
    fn write_str(&mut self, s: &str) {
        self.written.fetch_add(s.len(), Ordering::Relaxed);
        serial_print!("{}", s);
    }

    fn read_byte(&mut self) -> Option<u8> {
        let (&first, rest) = self.input.split_first()?;
        self.input = rest;
        Some(first)
    }
}

fn console(input: &'static [u8]) -> (SharedCharDevice, Arc<AtomicUsize>) {
    let written = Arc::new(AtomicUsize::new(0));
    let console = SerialConsole {
        input,
        written: written.clone(),
    };
    (Arc::new(Mutex::new(console)), written)
}

#[test_case]
fn exhaustion_returns_heap() {
    let (console, _) = console(b"");
    let volume = Volume::new();
    let stdio = Stdio::new(&volume, console);
    let counter = LiveCounter::new(|| {});
    let used = allocator::used();

    let outcome = exhaust(&mut KernelHeap, &counter, 50_000, &stdio);

    assert!(outcome.blocks >= 1);
    assert_eq!(counter.live(), 0);
    assert_eq!(counter.zero_crossings(), 1);
    assert!(allocator::used() <= used + 4096);
}

#[test_case]
fn default_block_length_fits_heap() {
    let (console, _) = console(b"");
    let volume = Volume::new();
    let stdio = Stdio::new(&volume, console);
    let counter = LiveCounter::new(|| {});
    let block_len = Options::default().block_len;
    assert!(block_len * core::mem::size_of::<probe::Tracked>() < allocator::size());

    let outcome = exhaust(&mut KernelHeap, &counter, block_len, &stdio);

    assert!(outcome.blocks >= 1);
    assert_eq!(counter.live(), 0);
    assert_eq!(counter.zero_crossings(), 1);
}

#[test_case]
fn probe_on_ram_disk() {
    let devices = DeviceNameService::new();
    StorageController::new(&devices, 64)
        .initialize()
        .expect("storage");
    let partition = devices.get_block(PARTITION_NAME).expect("partition");
    assert_eq!(partition.lock().block_count(), 127);

    let volume = Volume::new();
    mount_partition(&devices, &volume, PARTITION_NAME).expect("mount");
    let (console, written) = console(b"typed in qemu\r\n");
    let stdio = Stdio::new(&volume, console);
    let settings = ProbeSettings {
        output_file: "test.txt",
        block_len: 50_000,
    };

    let report = probe::run(&stdio, &mut KernelHeap, &settings).expect("probe");

    assert_eq!(report.line, "typed in qemu");
    assert!(report.exhaustion.blocks >= 1);
    assert_eq!(report.counter.live(), 0);
    assert!(written.load(Ordering::Relaxed) > 0);
    assert_eq!(
        read_all(&volume, "test.txt").expect("read back"),
        b"lorem ipsum\nOoops!\nvector entry 1\nvector entry 2\n"
    );
    volume.unmount().expect("unmount");
}

#[test_case]
fn usb_controller_present() {
    // The test configuration attaches a qemu-xhci controller.
    let found = pci::find_usb_controllers();
    assert!(found
        .iter()
        .any(|dev| dev.usb_kind() == Some(pci::UsbKind::Xhci)));
}
