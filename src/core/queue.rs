//! Lock-free intrusive delivery queue
//!
//! Producers link nodes onto an atomic stack through a [`Link`] embedded in
//! each node, so enqueueing never allocates. The consumer detaches the whole
//! stack with a single swap and reverses it into a [`Batch`], which restores
//! submission order.
//!
//! Because the consumer always takes the full list at once, a node is never
//! unlinked from the shared stack individually and the push path has no ABA
//! hazard. Between `push_back` and `pop_front` the queue owns every node.

use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Embedded "next" pointer of an intrusively queued node
pub struct Link<T> {
    next: AtomicPtr<T>,
}

impl<T> Link<T> {
    pub const fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl<T> Default for Link<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Link")
    }
}

/// A node type that carries its own queue link
pub trait Linked: Sized + Send {
    fn link(&self) -> &Link<Self>;
}

/// Multi-producer, single-consumer intrusive queue
pub struct IntrusiveQueue<T: Linked> {
    /// Newest node first
    head: AtomicPtr<T>,
    _owns: PhantomData<Box<T>>,
}

// SAFETY: nodes are handed from one thread to another, never shared; the
// queue only needs `T: Send` (guaranteed by `Linked`) to be used concurrently.
unsafe impl<T: Linked> Send for IntrusiveQueue<T> {}
unsafe impl<T: Linked> Sync for IntrusiveQueue<T> {}

impl<T: Linked> IntrusiveQueue<T> {
    pub const fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
            _owns: PhantomData,
        }
    }

    /// Link `node` at the tail.
    ///
    /// Returns `true` when the queue went from empty to non-empty, which is
    /// the only case where the consumer needs a wake-up.
    pub fn push_back(&self, node: Box<T>) -> bool {
        let node = Box::into_raw(node);
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            // SAFETY: `node` is uniquely owned until the exchange below
            // publishes it.
            unsafe { (*node).link().next.store(head, Ordering::Relaxed) };
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed)
            {
                Ok(previous) => return previous.is_null(),
                Err(current) => head = current,
            }
        }
    }

    /// Detach everything queued so far, oldest first
    pub fn take_batch(&self) -> Batch<T> {
        let mut node = self.head.swap(ptr::null_mut(), Ordering::Acquire);
        let mut reversed: *mut T = ptr::null_mut();
        while !node.is_null() {
            // SAFETY: the swap transferred ownership of the whole list to us
            // and the Acquire pairs with the producers' Release.
            let next = unsafe { (*node).link().next.load(Ordering::Relaxed) };
            unsafe { (*node).link().next.store(reversed, Ordering::Relaxed) };
            reversed = node;
            node = next;
        }
        Batch {
            head: reversed,
            _owns: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }
}

impl<T: Linked> Default for IntrusiveQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Linked> fmt::Debug for IntrusiveQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrusiveQueue")
            .field("empty", &self.is_empty())
            .finish()
    }
}

impl<T: Linked> Drop for IntrusiveQueue<T> {
    fn drop(&mut self) {
        let leftover = self.take_batch();
        debug_assert!(leftover.is_empty(), "intrusive queue dropped while non-empty");
    }
}

/// FIFO list detached from an [`IntrusiveQueue`], owned by the consumer
pub struct Batch<T: Linked> {
    head: *mut T,
    _owns: PhantomData<Box<T>>,
}

impl<T: Linked> Batch<T> {
    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// Unlink the oldest node; `None` once the batch is exhausted
    pub fn pop_front(&mut self) -> Option<Box<T>> {
        if self.head.is_null() {
            return None;
        }
        // SAFETY: every pointer in the batch came from `Box::into_raw` in
        // `push_back` and is owned exclusively by this batch.
        let node = unsafe { Box::from_raw(self.head) };
        self.head = node.link().next.swap(ptr::null_mut(), Ordering::Relaxed);
        Some(node)
    }
}

impl<T: Linked> Iterator for Batch<T> {
    type Item = Box<T>;

    fn next(&mut self) -> Option<Box<T>> {
        self.pop_front()
    }
}

impl<T: Linked> Drop for Batch<T> {
    fn drop(&mut self) {
        while self.pop_front().is_some() {}
    }
}
