//! Per-thread and per-package storage.
//!
//! Padded slot arrays indexed by worker or package id. Padding keeps two
//! workers' slots on different cache lines; the spacing matters more than
//! the contents, which is why the arrays are built once and never resized.

use std::cell::UnsafeCell;

use crossbeam::utils::CachePadded;

use crate::topology::{current_worker, my_package, topology};

/// One padded slot per worker.
///
/// Any worker may read any slot (`get`), which is what the stealing
/// policies do; the slot contents are responsible for their own
/// synchronization.
pub struct PerThread<T> {
    slots: Box<[CachePadded<T>]>,
}

impl<T> PerThread<T> {
    /// Builds the array with one slot per worker, initialized by `init`.
    pub fn new(mut init: impl FnMut(usize) -> T) -> Self {
        let slots = (0..topology().max_threads())
            .map(|i| CachePadded::new(init(i)))
            .collect();
        PerThread { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, worker: usize) -> &T {
        &self.slots[worker]
    }

    /// The current worker's slot.
    pub fn mine(&self) -> &T {
        self.get(current_worker())
    }

    /// Maps an arbitrary key onto a slot id.
    pub fn effective_id_for(&self, key: usize) -> usize {
        key % self.slots.len()
    }

    pub fn my_effective_id(&self) -> usize {
        current_worker()
    }
}

impl<T: Default> Default for PerThread<T> {
    fn default() -> Self {
        PerThread::new(|_| T::default())
    }
}

/// One padded slot per package, shared by all workers of that package.
pub struct PerPackage<T> {
    slots: Box<[CachePadded<T>]>,
}

impl<T> PerPackage<T> {
    pub fn new(mut init: impl FnMut(usize) -> T) -> Self {
        let slots = (0..topology().num_packages())
            .map(|i| CachePadded::new(init(i)))
            .collect();
        PerPackage { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, package: usize) -> &T {
        &self.slots[package]
    }

    /// The slot of the current worker's package.
    pub fn mine(&self) -> &T {
        self.get(my_package())
    }

    pub fn my_effective_id(&self) -> usize {
        my_package()
    }
}

impl<T: Default> Default for PerPackage<T> {
    fn default() -> Self {
        PerPackage::new(|_| T::default())
    }
}

/// Per-worker slots that only the owning worker touches.
///
/// Used for cursor state (current chunk, priority mirror, range position)
/// that needs mutation without any lock. Exclusive access comes from the
/// worker-id discipline instead of a `Mutex`: registration guarantees one
/// thread per id, and only `with_mine` hands out a mutable reference.
pub struct OwnedPerThread<T> {
    slots: Box<[CachePadded<UnsafeCell<T>>]>,
}

// SAFETY: each UnsafeCell is only ever accessed by the worker whose id
// matches the slot index (`with_mine`), or by a coordinator before any
// worker touches the structure (`with_slot`). Worker ids are unique per
// registered thread, so no two threads alias a slot.
unsafe impl<T: Send> Sync for OwnedPerThread<T> {}
unsafe impl<T: Send> Send for OwnedPerThread<T> {}

impl<T> OwnedPerThread<T> {
    pub fn new(mut init: impl FnMut(usize) -> T) -> Self {
        let slots = (0..topology().max_threads())
            .map(|i| CachePadded::new(UnsafeCell::new(init(i))))
            .collect();
        OwnedPerThread { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Runs `f` with exclusive access to the current worker's slot.
    ///
    /// `f` must not re-enter this structure; nothing in this crate does.
    pub fn with_mine<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let id = current_worker();
        // SAFETY: slot `id` belongs to this thread alone (see the Sync
        // justification above), and `f` cannot re-borrow the slot.
        unsafe { f(&mut *self.slots[id].get()) }
    }

    /// Runs `f` with access to an arbitrary slot.
    ///
    /// Only for coordinator-side initialization before workers start (the
    /// range policies seed every worker's cursor in one call). Calling this
    /// while the owning worker is active would race.
    pub(crate) fn with_slot<R>(&self, worker: usize, f: impl FnOnce(&mut T) -> R) -> R {
        // SAFETY: per the documented contract, the owning worker is not
        // running yet, so the slot is unaliased.
        unsafe { f(&mut *self.slots[worker].get()) }
    }
}

impl<T: Default> Default for OwnedPerThread<T> {
    fn default() -> Self {
        OwnedPerThread::new(|_| T::default())
    }
}
