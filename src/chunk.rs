//! Fixed-capacity chunks and the chunk pool.
//!
//! A chunk is a bounded ring of items and the unit of bulk transfer between
//! workers: a worker fills one privately, publishes it whole, and another
//! worker drains it privately. The pool recycles drained chunks through a
//! lock-free free list so steady-state operation stays off the global
//! allocator.
//!
//! # Invariants
//! - `head < N` and `len <= N`.
//! - Slots in the logical range `[head, head + len)` (wrapping mod `N`) are
//!   initialized; all other slots are uninitialized.

use std::mem::MaybeUninit;

use crossbeam::queue::SegQueue;

use crate::metrics::count;

/// Create an uninitialized `[MaybeUninit<T>; N]` without running any
/// constructors.
fn uninit_array<T, const N: usize>() -> [MaybeUninit<T>; N] {
    // SAFETY: an uninitialized MaybeUninit<T> is valid.
    unsafe { MaybeUninit::<[MaybeUninit<T>; N]>::uninit().assume_init() }
}

/// Bounded ring buffer of work items with capacity `N`.
///
/// Supports both drain directions so the enclosing policy can treat it as a
/// queue (`pop_front`) or a stack (`pop_back`).
pub struct Chunk<T, const N: usize = 64> {
    buf: [MaybeUninit<T>; N],
    head: usize,
    len: usize,
}

impl<T, const N: usize> Chunk<T, N> {
    const CAPACITY_OK: () = assert!(N > 0, "chunk capacity must be at least 1");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::CAPACITY_OK;
        Chunk {
            buf: uninit_array(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Appends `item`, handing it back if the chunk is full.
    pub fn push_back(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        let slot = (self.head + self.len) % N;
        self.buf[slot].write(item);
        self.len += 1;
        Ok(())
    }

    /// Removes the most recently pushed item.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.len -= 1;
        let slot = (self.head + self.len) % N;
        // SAFETY: the slot was inside [head, head + len) before the
        // decrement, so it holds an initialized item, and shrinking `len`
        // first means no other accessor considers it initialized anymore.
        Some(unsafe { self.buf[slot].assume_init_read() })
    }

    /// Removes the oldest item.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let slot = self.head;
        self.head = (self.head + 1) % N;
        self.len -= 1;
        // SAFETY: `slot` was the logical front, initialized by invariant;
        // advancing `head` removes it from the initialized range.
        Some(unsafe { self.buf[slot].assume_init_read() })
    }
}

impl<T, const N: usize> Default for Chunk<T, N> {
    fn default() -> Self {
        Chunk::new()
    }
}

impl<T, const N: usize> Drop for Chunk<T, N> {
    fn drop(&mut self) {
        while self.pop_front().is_some() {}
    }
}

/// Recycler for boxed chunks.
///
/// Draining and refilling chunks is the hot path of the chunked policies;
/// routing retired chunks through a lock-free free list keeps that path off
/// the allocator. Ownership moves through the queue whole, so there is
/// nothing to reclaim besides the boxes themselves.
pub struct ChunkPool<T, const N: usize = 64> {
    free: SegQueue<Box<Chunk<T, N>>>,
}

impl<T, const N: usize> ChunkPool<T, N> {
    pub fn new() -> Self {
        ChunkPool {
            free: SegQueue::new(),
        }
    }

    /// Hands out an empty chunk, recycled if one is available.
    pub fn alloc(&self) -> Box<Chunk<T, N>> {
        match self.free.pop() {
            Some(chunk) => {
                count!(chunks_recycled);
                debug_assert!(chunk.is_empty());
                chunk
            }
            None => {
                count!(chunks_allocated);
                Box::new(Chunk::new())
            }
        }
    }

    /// Returns a drained chunk for reuse.
    pub fn recycle(&self, chunk: Box<Chunk<T, N>>) {
        debug_assert!(chunk.is_empty(), "recycled a chunk that still holds items");
        self.free.push(chunk);
    }
}

impl<T, const N: usize> Default for ChunkPool<T, N> {
    fn default() -> Self {
        ChunkPool::new()
    }
}
