//! Paging and physical frame allocation.
//!
//! The bootloader maps all physical memory at a fixed virtual offset, so
//! the active level 4 table can be reached directly through that mapping.

use bootloader::bootinfo::{MemoryMap, MemoryRegionType};
use x86_64::registers::control::Cr3;
use x86_64::structures::paging::{
    FrameAllocator, OffsetPageTable, PageTable, PhysFrame, Size4KiB,
};
use x86_64::{PhysAddr, VirtAddr};

const FRAME_SIZE: u64 = 4096;

/// Build a mapper over the active page tables.
///
/// # Safety
///
/// All physical memory must be mapped at `physical_memory_offset`, and this
/// must be called only once to avoid aliasing `&mut` page tables.
pub unsafe fn init_mapper(physical_memory_offset: VirtAddr) -> OffsetPageTable<'static> {
    // SAFETY: Forwarded from the caller's contract.
    unsafe {
        let level_4_table = active_level_4_table(physical_memory_offset);
        OffsetPageTable::new(level_4_table, physical_memory_offset)
    }
}

/// # Safety
///
/// Same contract as [`init_mapper`].
unsafe fn active_level_4_table(physical_memory_offset: VirtAddr) -> &'static mut PageTable {
    let (level_4_frame, _) = Cr3::read();
    let virt = physical_memory_offset + level_4_frame.start_address().as_u64();
    let table: *mut PageTable = virt.as_mut_ptr();
    // SAFETY: The frame holds the live level 4 table and is mapped at
    // `virt` by the bootloader.
    unsafe { &mut *table }
}

/// Total bytes in regions the memory map marks usable.
pub fn usable_bytes(memory_map: &MemoryMap) -> u64 {
    memory_map
        .iter()
        .filter(|region| region.region_type == MemoryRegionType::Usable)
        .map(|region| region.range.end_addr() - region.range.start_addr())
        .sum()
}

/// Hands out usable frames from the bootloader's memory map.
///
/// Walks the map once, in address order, so mapping a large heap stays
/// linear in the number of frames.
pub struct BootInfoFrameAllocator {
    memory_map: &'static MemoryMap,
    region: usize,
    next: u64,
}

impl BootInfoFrameAllocator {
    /// Create a frame allocator over `memory_map`.
    ///
    /// # Safety
    ///
    /// Every region marked usable must really be unused.
    pub unsafe fn init(memory_map: &'static MemoryMap) -> Self {
        Self {
            memory_map,
            region: 0,
            next: 0,
        }
    }
}

// SAFETY: The cursor only moves forward, so each usable frame is returned
// at most once.
unsafe impl FrameAllocator<Size4KiB> for BootInfoFrameAllocator {
    fn allocate_frame(&mut self) -> Option<PhysFrame> {
        while let Some(region) = self.memory_map.get(self.region) {
            if region.region_type == MemoryRegionType::Usable {
                let start = self.next.max(region.range.start_addr());
                if start + FRAME_SIZE <= region.range.end_addr() {
                    self.next = start + FRAME_SIZE;
                    return Some(PhysFrame::containing_address(PhysAddr::new(start)));
                }
            }
            self.region += 1;
        }
        None
    }
}
