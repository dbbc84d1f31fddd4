//! Kernel heap allocation.
//!
//! The heap is a fixed virtual range backed by frames mapped at boot. Its
//! size follows the amount of usable RAM the bootloader reports. Allocation
//! failure is reported to callers that use the fallible collection APIs;
//! infallible allocations abort as usual.

use core::sync::atomic::{AtomicUsize, Ordering};
use linked_list_allocator::LockedHeap;
use x86_64::{
    structures::paging::{
        mapper::MapToError, FrameAllocator, Mapper, Page, PageTableFlags, Size4KiB,
    },
    VirtAddr,
};

/// The start address of the kernel heap.
pub const HEAP_START: usize = 0x_4444_4444_0000;
/// Smallest heap the kernel maps.
pub const MIN_HEAP_SIZE: usize = 8 * 1024 * 1024;
/// Largest heap the kernel maps.
pub const MAX_HEAP_SIZE: usize = 1024 * 1024 * 1024;

const PAGE_SIZE: usize = 4096;

static HEAP_SIZE: AtomicUsize = AtomicUsize::new(0);

// Host unit tests run on the host's allocator.
#[cfg(not(test))]
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

#[cfg(test)]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Heap size for a machine with `usable` bytes of free RAM.
///
/// Three quarters of free memory, kept within
/// [`MIN_HEAP_SIZE`]..=[`MAX_HEAP_SIZE`] and rounded down to whole pages.
/// The remaining quarter holds the heap's page tables.
pub fn heap_size_for(usable: u64) -> usize {
    let quarter = usize::try_from(usable / 4).unwrap_or(usize::MAX);
    let size = quarter.saturating_mul(3).clamp(MIN_HEAP_SIZE, MAX_HEAP_SIZE);
    size & !(PAGE_SIZE - 1)
}

/// Size of the mapped heap in bytes; zero before [`init_heap`].
pub fn size() -> usize {
    HEAP_SIZE.load(Ordering::Relaxed)
}

/// Bytes currently allocated from the kernel heap.
pub fn used() -> usize {
    ALLOCATOR.lock().used()
}

/// Map `size` bytes of heap and hand them to the allocator.
pub fn init_heap(
    mapper: &mut impl Mapper<Size4KiB>,
    frame_allocator: &mut impl FrameAllocator<Size4KiB>,
    size: usize,
) -> Result<(), MapToError<Size4KiB>> {
    let page_range = {
        let heap_start = VirtAddr::new(HEAP_START as u64);
        let heap_end = heap_start + size - 1u64;
        Page::range_inclusive(
            Page::containing_address(heap_start),
            Page::containing_address(heap_end),
        )
    };

    for page in page_range {
        let frame = frame_allocator
            .allocate_frame()
            .ok_or(MapToError::FrameAllocationFailed)?;
        let flags = PageTableFlags::PRESENT | PageTableFlags::WRITABLE;
        // SAFETY: The frame is fresh from the frame allocator and the heap
        // range is not mapped anywhere else.
        unsafe {
            mapper.map_to(page, frame, flags, frame_allocator)?.flush();
        }
    }

    // SAFETY: The range was mapped read/write above and init_heap runs once.
    unsafe {
        ALLOCATOR.lock().init(HEAP_START as *mut u8, size);
    }
    HEAP_SIZE.store(size, Ordering::Relaxed);

    Ok(())
}
