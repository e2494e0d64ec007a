//! Process-wide memory accounting
//!
//! [`CountingAllocator`] forwards to the system allocator and keeps a running
//! total of live heap bytes. Install it with `#[global_allocator]` to make
//! [`allocated_memory`] meaningful:
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: tidelog::CountingAllocator = tidelog::CountingAllocator;
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicI64, Ordering};

static ALLOCATED: AtomicI64 = AtomicI64::new(0);

/// Thin counting wrapper over [`System`]
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingAllocator;

// SAFETY: every call is forwarded unchanged to `System`; the counter is
// only adjusted after a successful allocation.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            ALLOCATED.fetch_add(layout.size() as i64, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            ALLOCATED.fetch_add(layout.size() as i64, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        ALLOCATED.fetch_sub(layout.size() as i64, Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            ALLOCATED.fetch_add(new_size as i64 - layout.size() as i64, Ordering::Relaxed);
        }
        new_ptr
    }
}

/// Live heap bytes allocated through [`CountingAllocator`]
pub fn allocated_memory() -> i64 {
    ALLOCATED.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_allocation_is_counted() {
        let allocator = CountingAllocator;
        let layout = Layout::from_size_align(4096, 8).unwrap();
        // Other tests may allocate through the same counter only when it is
        // the global allocator, which it is not in unit tests.
        let before = allocated_memory();
        unsafe {
            let ptr = allocator.alloc(layout);
            assert!(!ptr.is_null());
            assert_eq!(allocated_memory() - before, 4096);

            let ptr = allocator.realloc(ptr, layout, 8192);
            assert!(!ptr.is_null());
            assert_eq!(allocated_memory() - before, 8192);

            allocator.dealloc(ptr, Layout::from_size_align(8192, 8).unwrap());
        }
        assert_eq!(allocated_memory(), before);
    }
}
