//! Lock-free MPMC stack.
//!
//! A Treiber stack used as the LIFO chunk container of the chunked
//! policies. Values move out of popped nodes by ownership; only the node
//! shells go through epoch-based reclamation, so a popped chunk can be
//! reused immediately.

use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::Ordering;

use crossbeam::epoch::{self, Atomic, Owned};

struct Node<T> {
    value: ManuallyDrop<T>,
    next: Atomic<Node<T>>,
}

/// Treiber stack: push and pop CAS the head; contention retries, never
/// blocks.
pub struct LockFreeStack<T> {
    head: Atomic<Node<T>>,
}

// SAFETY: values are moved in whole on push and moved out exactly once on
// pop; nodes are reclaimed through epochs after they are unlinked.
unsafe impl<T: Send> Send for LockFreeStack<T> {}
unsafe impl<T: Send> Sync for LockFreeStack<T> {}

impl<T> LockFreeStack<T> {
    pub fn new() -> Self {
        LockFreeStack {
            head: Atomic::null(),
        }
    }

    pub fn push(&self, value: T) {
        let guard = epoch::pin();
        let mut node = Owned::new(Node {
            value: ManuallyDrop::new(value),
            next: Atomic::null(),
        });
        loop {
            let head = self.head.load(Ordering::Relaxed, &guard);
            node.next.store(head, Ordering::Relaxed);
            match self
                .head
                .compare_exchange(head, node, Ordering::Release, Ordering::Relaxed, &guard)
            {
                Ok(_) => return,
                Err(e) => node = e.new,
            }
        }
    }

    pub fn pop(&self) -> Option<T> {
        let guard = epoch::pin();
        loop {
            let head = self.head.load(Ordering::Acquire, &guard);
            let node = unsafe { head.as_ref() }?;
            let next = node.next.load(Ordering::Relaxed, &guard);
            if self
                .head
                .compare_exchange(head, next, Ordering::Release, Ordering::Relaxed, &guard)
                .is_ok()
            {
                // SAFETY: the successful CAS unlinked the node, making this
                // thread its unique owner. The value moves out here; only
                // the node shell is handed to the epoch collector, and its
                // ManuallyDrop field keeps the collector from dropping the
                // value a second time.
                unsafe {
                    let value = ManuallyDrop::into_inner(ptr::read(&node.value));
                    guard.defer_destroy(head);
                    return Some(value);
                }
            }
        }
    }
}

impl<T> Default for LockFreeStack<T> {
    fn default() -> Self {
        LockFreeStack::new()
    }
}

impl<T> Drop for LockFreeStack<T> {
    fn drop(&mut self) {
        // SAFETY: &mut self means no other thread holds a reference, so
        // the list can be walked and freed without pinning.
        unsafe {
            let guard = epoch::unprotected();
            let mut cur = self.head.load(Ordering::Relaxed, guard);
            while let Some(node) = cur.as_ref() {
                let next = node.next.load(Ordering::Relaxed, guard);
                let mut owned = cur.into_owned();
                ManuallyDrop::drop(&mut owned.value);
                drop(owned);
                cur = next;
            }
        }
    }
}
