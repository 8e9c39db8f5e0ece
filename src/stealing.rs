//! Stealing composites: per-thread and per-package queues with neighbor
//! fallback.

use std::marker::PhantomData;

use crate::contract::Worklist;
use crate::metrics::count;
use crate::percpu::{PerPackage, PerThread};
use crate::simple::Fifo;
use crate::topology::{active_threads, next_worker, topology};

/// One concurrent worklist per thread; a missing pop tries the round-robin
/// successor's worklist once.
///
/// Pushes never contend. A single failed steal per pop keeps the miss path
/// cheap; persistent imbalance still drains because the successor relation
/// cycles through every active worker.
pub struct LocalStealing<T, W = Fifo<T>> {
    local: PerThread<W>,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T, W: Default> LocalStealing<T, W> {
    pub fn new() -> Self {
        LocalStealing {
            local: PerThread::new(|_| W::default()),
            _marker: PhantomData,
        }
    }
}

impl<T, W: Default> Default for LocalStealing<T, W> {
    fn default() -> Self {
        LocalStealing::new()
    }
}

impl<T, W: Worklist<T>> Worklist<T> for LocalStealing<T, W> {
    fn push(&self, item: T) {
        self.local.mine().push(item);
    }

    fn push_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.local.mine().push_many(items);
    }

    fn push_initial<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.local.mine().push_initial(items);
    }

    fn pop(&self) -> Option<T> {
        if let Some(item) = self.local.mine().pop() {
            return Some(item);
        }
        let victim = next_worker(active_threads());
        match self.local.get(victim).pop() {
            Some(item) => {
                count!(neighbor_steals_success);
                Some(item)
            }
            None => {
                count!(neighbor_steals_failed);
                None
            }
        }
    }
}

/// One concurrent worklist per package, shared by the package's workers; a
/// missing pop rotates through the other packages in use.
pub struct LevelStealing<T, W = Fifo<T>> {
    local: PerPackage<W>,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T, W: Default> LevelStealing<T, W> {
    pub fn new() -> Self {
        LevelStealing {
            local: PerPackage::new(|_| W::default()),
            _marker: PhantomData,
        }
    }
}

impl<T, W: Default> Default for LevelStealing<T, W> {
    fn default() -> Self {
        LevelStealing::new()
    }
}

impl<T, W: Worklist<T>> Worklist<T> for LevelStealing<T, W> {
    fn push(&self, item: T) {
        self.local.mine().push(item);
    }

    fn push_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.local.mine().push_many(items);
    }

    fn push_initial<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.local.mine().push_initial(items);
    }

    fn pop(&self) -> Option<T> {
        if let Some(item) = self.local.mine().pop() {
            return Some(item);
        }

        // Only packages that actually host active workers are worth
        // visiting.
        let max_package = topology().max_package_for(active_threads() - 1);
        let mut id = self.local.my_effective_id();
        for _ in 0..self.local.len() {
            id = (id + 1) % self.local.len();
            if id <= max_package {
                if let Some(item) = self.local.get(id).pop() {
                    count!(package_steals_success);
                    return Some(item);
                }
            }
        }
        count!(package_steals_failed);
        None
    }
}
