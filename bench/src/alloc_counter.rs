//! Per-thread allocation counting
//!
//! [`CountingAllocator`] wraps the system allocator and bumps a thread-local
//! counter on every allocation. The latency harness reads the counter around
//! a timed loop to report allocs/op. Counters are thread-local, so throughput
//! workers never contend on them.
//!
//! The `cachemark` binary installs it as the global allocator; under
//! any other allocator [`thread_allocations`] stays at zero.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
    static ALLOCATIONS: Cell<u64> = const { Cell::new(0) };
}

/// System allocator that counts allocations per thread
pub struct CountingAllocator;

impl CountingAllocator {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for CountingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn bump() {
    // try_with: the slot is gone during thread teardown
    let _ = ALLOCATIONS.try_with(|c| c.set(c.get().wrapping_add(1)));
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        bump();
        System.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        bump();
        System.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        bump();
        System.realloc(ptr, layout, new_size)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

/// Allocations made by the current thread so far.
pub fn thread_allocations() -> u64 {
    ALLOCATIONS.try_with(Cell::get).unwrap_or(0)
}
