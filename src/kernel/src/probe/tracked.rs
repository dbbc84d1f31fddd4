//! Self-counting values.
//!
//! Every [`Tracked`] holds a shared [`LiveCounter`] and bumps it for as long
//! as it lives. When the count drops back to zero the counter fires its
//! zero-crossing callback.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Count of live [`Tracked`] instances.
pub struct LiveCounter {
    live: AtomicUsize,
    zero_crossings: AtomicUsize,
    on_zero: Box<dyn Fn() + Send + Sync>,
}

impl LiveCounter {
    /// Create a counter that calls `on_zero` each time the count returns to zero.
    pub fn new(on_zero: impl Fn() + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            live: AtomicUsize::new(0),
            zero_crossings: AtomicUsize::new(0),
            on_zero: Box::new(on_zero),
        })
    }

    /// Number of live instances.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// How many times the count has returned to zero.
    pub fn zero_crossings(&self) -> usize {
        self.zero_crossings.load(Ordering::Acquire)
    }

    fn acquire(&self) {
        self.live.fetch_add(1, Ordering::AcqRel);
    }

    fn release(&self) {
        let previous = match self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => previous,
            Err(_) => panic!("live instance counter released below zero"),
        };
        if previous == 1 {
            self.zero_crossings.fetch_add(1, Ordering::AcqRel);
            (self.on_zero)();
        }
    }
}

/// A small value that is counted while alive.
pub struct Tracked {
    counter: Arc<LiveCounter>,
    // Ballast that gives each instance its size.
    #[allow(dead_code)]
    payload: [i32; 5],
}

impl Tracked {
    /// Create an instance counted by `counter`.
    pub fn new(counter: &Arc<LiveCounter>) -> Self {
        counter.acquire();
        Self {
            counter: counter.clone(),
            payload: [0; 5],
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counter.release();
    }
}
