//! Heap exhaustion check.
//!
//! Allocates blocks of [`Tracked`] values and keeps every one of them alive
//! until an allocation fails. The retained blocks are then dropped together,
//! which must bring the live counter back to zero.
//!
//! A block's whole storage is reserved before any element is constructed,
//! so a failed allocation never leaves a partially built block behind.

use super::tracked::{LiveCounter, Tracked};
use crate::stdio::Stdio;
use crate::{errln, outln};
use alloc::collections::TryReserveError;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::mem::size_of;

/// A block of tracked values.
pub type Block = Vec<Tracked>;

/// Why a block could not be allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The heap could not satisfy the request.
    Heap(TryReserveError),
    /// The request exceeds the remaining byte quota.
    Quota {
        /// Bytes requested.
        requested: usize,
        /// Bytes left in the quota.
        remaining: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::Heap(err) => write!(f, "{}", err),
            AllocError::Quota {
                requested,
                remaining,
            } => write!(
                f,
                "allocation of {} bytes exceeds remaining quota of {} bytes",
                requested, remaining
            ),
        }
    }
}

impl From<TryReserveError> for AllocError {
    fn from(err: TryReserveError) -> Self {
        AllocError::Heap(err)
    }
}

/// Source of tracked blocks.
pub trait BlockAllocator {
    /// Allocate `len` tracked values counted by `counter`.
    fn allocate(&mut self, len: usize, counter: &Arc<LiveCounter>) -> Result<Block, AllocError>;

    /// Make room in `blocks` for one more block.
    fn retain(&mut self, blocks: &mut Vec<Block>) -> Result<(), AllocError> {
        blocks.try_reserve(1)?;
        Ok(())
    }
}

/// Allocates blocks from the kernel heap.
pub struct KernelHeap;

impl BlockAllocator for KernelHeap {
    fn allocate(&mut self, len: usize, counter: &Arc<LiveCounter>) -> Result<Block, AllocError> {
        let mut block = Vec::new();
        block.try_reserve_exact(len)?;
        // Capacity is already reserved; these pushes do not allocate.
        block.extend((0..len).map(|_| Tracked::new(counter)));
        Ok(block)
    }
}

/// Caps the number of bytes an inner allocator may hand out.
pub struct Quota<A> {
    inner: A,
    remaining: usize,
}

impl<A> Quota<A> {
    /// Allow at most `bytes` bytes of tracked values from `inner`.
    pub fn new(inner: A, bytes: usize) -> Self {
        Self {
            inner,
            remaining: bytes,
        }
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl<A: BlockAllocator> BlockAllocator for Quota<A> {
    fn allocate(&mut self, len: usize, counter: &Arc<LiveCounter>) -> Result<Block, AllocError> {
        let requested = len.saturating_mul(size_of::<Tracked>());
        if requested > self.remaining {
            return Err(AllocError::Quota {
                requested,
                remaining: self.remaining,
            });
        }
        let block = self.inner.allocate(len, counter)?;
        self.remaining -= requested;
        Ok(block)
    }

    /// Charges one slot of the retaining collection.
    fn retain(&mut self, blocks: &mut Vec<Block>) -> Result<(), AllocError> {
        let requested = size_of::<Block>();
        if requested > self.remaining {
            return Err(AllocError::Quota {
                requested,
                remaining: self.remaining,
            });
        }
        self.inner.retain(blocks)?;
        self.remaining -= requested;
        Ok(())
    }
}

/// Outcome of the exhaustion check.
#[derive(Debug)]
pub struct Exhaustion {
    /// Blocks held when allocation failed.
    pub blocks: usize,
    /// The failure that ended the loop.
    pub error: AllocError,
}

/// Allocate blocks of `block_len` values until `allocator` fails.
///
/// Every block stays alive until the failure; all are dropped before this
/// returns.
pub fn exhaust<A: BlockAllocator>(
    allocator: &mut A,
    counter: &Arc<LiveCounter>,
    block_len: usize,
    stdio: &Stdio<'_>,
) -> Exhaustion {
    outln!(stdio, "size of Tracked: {}", size_of::<Tracked>());

    let mut blocks: Vec<Block> = Vec::new();
    let error = loop {
        outln!(stdio, "Allocating large array of tracked instances");
        let block = match allocator.allocate(block_len, counter) {
            Ok(block) => block,
            Err(err) => break err,
        };
        // A block that cannot be retained is dropped right here.
        if let Err(err) = allocator.retain(&mut blocks) {
            break err;
        }
        outln!(stdio, "Allocated block at {:p}", block.as_ptr());
        blocks.push(block);
    };

    let held = blocks.len();
    drop(blocks);
    errln!(stdio, "allocation failure caught: {}", error);

    Exhaustion {
        blocks: held,
        error,
    }
}
