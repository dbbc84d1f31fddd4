//! ProbeOS Kernel Entry Point

#![no_std]
#![no_main]

extern crate alloc;

use ::x86_64::VirtAddr;
use bootloader::{entry_point, BootInfo};
use core::panic::PanicInfo;
use probeos_common::ShutdownMode;
use probeos_kernel::arch::x86_64::{self, vga::Color};
use probeos_kernel::boot::{self, Status};
use probeos_kernel::config::Options;
use probeos_kernel::kernel::Kernel;
use probeos_kernel::{allocator, memory, println, serial_println};

entry_point!(kernel_main);

/// Kernel entry point.
///
/// Called by the bootloader after setting up the initial environment.
fn kernel_main(boot_info: &'static BootInfo) -> ! {
    probeos_kernel::init();

    let phys_mem_offset = VirtAddr::new(boot_info.physical_memory_offset);
    // SAFETY: The bootloader maps all physical memory at this offset, its
    // memory map marks only free frames usable, and this runs once.
    let mut mapper = unsafe { memory::init_mapper(phys_mem_offset) };
    let mut frame_allocator = unsafe { memory::BootInfoFrameAllocator::init(&boot_info.memory_map) };
    let heap_size = allocator::heap_size_for(memory::usable_bytes(&boot_info.memory_map));
    if let Err(err) = allocator::init_heap(&mut mapper, &mut frame_allocator, heap_size) {
        panic!("heap initialization failed: {:?}", err);
    }

    x86_64::vga::clear_screen();
    boot::banner::print_banner();
    boot::log(
        Status::Ok,
        &alloc::format!("Kernel heap ready ({} MiB)", allocator::size() >> 20),
    );
    probeos_kernel::tests::run_all();

    let options = match Options::from_build_env() {
        Ok(options) => options,
        Err(err) => {
            boot::log(Status::Warn, &alloc::format!("{}; using defaults", err));
            Options::default()
        }
    };

    let mut kernel = Kernel::new(options);
    if let Err(err) = kernel.initialize() {
        panic!("{}", err);
    }

    match kernel.run() {
        ShutdownMode::Halt => {
            boot::log(Status::Info, "System halted");
            x86_64::halt_loop()
        }
        ShutdownMode::Reboot => {
            boot::log(Status::Info, "Rebooting");
            x86_64::reboot()
        }
    }
}

/// Panic handler.
///
/// Called when the kernel encounters an unrecoverable error.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!("KERNEL PANIC: {}", info);

    x86_64::vga::set_color(Color::LightRed, Color::Black);
    println!("\n\n!!! KERNEL PANIC !!!");
    x86_64::vga::set_color(Color::White, Color::Black);
    println!("{}", info);

    x86_64::halt_loop()
}
