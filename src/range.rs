//! Read-only range worklists.
//!
//! These serve items that already exist in a slice; they partition instead
//! of storing. Ordinary pushes are a programming error and panic. Seeding
//! happens through the policy-specific `push_initial(&self, slice)` before
//! any worker pops.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::contract::Worklist;
use crate::metrics::count;
use crate::percpu::{OwnedPerThread, PerPackage};
use crate::topology::{active_threads, current_worker, topology};

fn reject_push(policy: &str) -> ! {
    panic!("{} is a read-only range; it does not accept pushes", policy);
}

struct RangeCursor<'a, T> {
    slice: &'a [T],
    begin: usize,
    end: usize,
    /// Set once both the package slice and the global residue are gone;
    /// this worker returns `None` forever after.
    failed: bool,
}

#[derive(Default)]
struct SliceBounds {
    begin: usize,
    end: usize,
}

/// Work-stealing partition of a random-access range.
///
/// Seeding reserves the first `n/16` positions as a global residue and
/// splits the rest into one equal block per worker. A worker that drains
/// its block carves a share from its package's slice; an empty package
/// slice is refilled by halving the residue with a CAS. `MINSIZE` is the
/// smallest slice still worth splitting.
///
/// Every worker must call [`push_initial`](RandomAccessRange::push_initial)
/// with the same slice before popping.
pub struct RandomAccessRange<'a, T, const MINSIZE: usize = 16> {
    cursors: OwnedPerThread<RangeCursor<'a, T>>,
    packages: PerPackage<Mutex<SliceBounds>>,
    residue: AtomicUsize,
}

impl<'a, T, const MINSIZE: usize> RandomAccessRange<'a, T, MINSIZE> {
    pub fn new() -> Self {
        RandomAccessRange {
            cursors: OwnedPerThread::new(|_| RangeCursor {
                slice: &[],
                begin: 0,
                end: 0,
                failed: false,
            }),
            packages: PerPackage::new(|_| Mutex::new(SliceBounds::default())),
            residue: AtomicUsize::new(0),
        }
    }

    /// Installs the range on the calling worker.
    ///
    /// Every worker calls this with the same slice; worker 0 additionally
    /// publishes the global residue.
    pub fn push_initial(&self, slice: &'a [T]) {
        let tid = current_worker();
        let num = active_threads();
        let n = slice.len();
        let rest = n / 16;
        let t = n - rest;
        let block = (t + num - 1) / num;

        if tid == 0 {
            // Small race if workers start stealing before this store
            // lands; the region contract is that seeding happens first.
            self.residue.store(rest, Ordering::Release);
        }

        self.cursors.with_mine(|c| {
            c.slice = slice;
            c.failed = false;
            c.begin = rest + (tid * block).min(t);
            c.end = rest + ((tid + 1) * block).min(t);
        });
    }

    /// Halves the residue into this package's slice. Returns false once the
    /// residue is exhausted.
    fn try_global_steal(&self, bounds: &mut SliceBounds) -> bool {
        let mut end = self.residue.load(Ordering::Relaxed);
        loop {
            if end == 0 {
                return false;
            }
            let mut begin = end / 2;
            if end - begin < MINSIZE {
                begin = 0;
            }
            match self.residue.compare_exchange(
                end,
                begin,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    count!(range_global_steals);
                    bounds.begin = begin;
                    bounds.end = end;
                    return true;
                }
                Err(current) => end = current,
            }
        }
    }

    /// Carves a block from the package slice into the worker's cursor,
    /// refilling the slice from the residue when it runs out.
    fn try_package_steal(&self, cursor: &mut RangeCursor<'a, T>) -> bool {
        let package = self.packages.mine();
        let mut bounds = package.lock();
        loop {
            if bounds.begin == bounds.end {
                if self.try_global_steal(&mut bounds) {
                    continue;
                }
                return false;
            }

            let packages_in_use = topology().max_package_for(active_threads() - 1) + 1;
            let end = bounds.end;
            let total = end - bounds.begin;
            let mut block = (total + packages_in_use - 1) / packages_in_use;
            if block < MINSIZE {
                block = total;
            }
            bounds.end -= block;
            drop(bounds);

            count!(range_package_carves);
            cursor.begin = end - block;
            cursor.end = end;
            return true;
        }
    }

    /// Takes the worker's entire remaining subslice in one step, stealing a
    /// fresh block first if the cursor is empty. For bulk operators.
    pub fn pop_range(&self) -> Option<&'a [T]> {
        self.cursors.with_mine(|c| {
            if c.failed {
                return None;
            }
            loop {
                if c.begin != c.end {
                    let slice = c.slice;
                    let taken = &slice[c.begin..c.end];
                    c.begin = c.end;
                    return Some(taken);
                }
                if self.try_package_steal(c) {
                    continue;
                }
                c.failed = true;
                return None;
            }
        })
    }
}

impl<'a, T, const MINSIZE: usize> Default for RandomAccessRange<'a, T, MINSIZE> {
    fn default() -> Self {
        RandomAccessRange::new()
    }
}

impl<'a, T: Copy, const MINSIZE: usize> Worklist<T> for RandomAccessRange<'a, T, MINSIZE> {
    fn push(&self, _item: T) {
        reject_push("RandomAccessRange");
    }

    fn push_many<I>(&self, _items: I)
    where
        I: IntoIterator<Item = T>,
    {
        reject_push("RandomAccessRange");
    }

    fn pop(&self) -> Option<T> {
        self.cursors.with_mine(|c| {
            if c.failed {
                return None;
            }
            loop {
                if c.begin != c.end {
                    let item = c.slice[c.begin];
                    c.begin += 1;
                    return Some(item);
                }
                if self.try_package_steal(c) {
                    continue;
                }
                c.failed = true;
                return None;
            }
        })
    }
}

struct StrideCursor<'a, T> {
    slice: &'a [T],
    begin: usize,
}

/// Strided traversal of a forward range: worker `t` starts at position `t`
/// and advances by the worker count, so the workers cover the range
/// disjointly without any shared state.
///
/// `push_initial` is called once, by the coordinator; it staggers every
/// worker's starting position and captures the stride.
pub struct ForwardAccessRange<'a, T> {
    cursors: OwnedPerThread<StrideCursor<'a, T>>,
    stride: AtomicUsize,
}

impl<'a, T> ForwardAccessRange<'a, T> {
    pub fn new() -> Self {
        ForwardAccessRange {
            cursors: OwnedPerThread::new(|_| StrideCursor {
                slice: &[],
                begin: 0,
            }),
            stride: AtomicUsize::new(0),
        }
    }

    /// Staggers each worker's start over `slice`. Coordinator-side, before
    /// any worker pops.
    pub fn push_initial(&self, slice: &'a [T]) {
        let num = active_threads();
        self.stride.store(num, Ordering::Release);
        for worker in 0..num {
            self.cursors.with_slot(worker, |c| {
                c.slice = slice;
                c.begin = worker.min(slice.len());
            });
        }
    }
}

impl<'a, T> Default for ForwardAccessRange<'a, T> {
    fn default() -> Self {
        ForwardAccessRange::new()
    }
}

impl<'a, T: Copy> Worklist<T> for ForwardAccessRange<'a, T> {
    fn push(&self, _item: T) {
        reject_push("ForwardAccessRange");
    }

    fn push_many<I>(&self, _items: I)
    where
        I: IntoIterator<Item = T>,
    {
        reject_push("ForwardAccessRange");
    }

    fn pop(&self) -> Option<T> {
        let stride = self.stride.load(Ordering::Acquire);
        if stride == 0 {
            return None;
        }
        self.cursors.with_mine(|c| {
            if c.begin < c.slice.len() {
                let item = c.slice[c.begin];
                c.begin = (c.begin + stride).min(c.slice.len());
                Some(item)
            } else {
                None
            }
        })
    }
}

struct BlockCursor<'a, T> {
    slice: &'a [T],
    begin: usize,
    end: usize,
}

/// Static equal partition of a random-access range: worker `t` owns the
/// `t`-th block of `ceil(n / workers)` positions, with no stealing. Best
/// when per-item work is balanced.
///
/// `push_initial` is called once, by the coordinator.
pub struct StaticRandomAccessRange<'a, T> {
    cursors: OwnedPerThread<BlockCursor<'a, T>>,
}

impl<'a, T> StaticRandomAccessRange<'a, T> {
    pub fn new() -> Self {
        StaticRandomAccessRange {
            cursors: OwnedPerThread::new(|_| BlockCursor {
                slice: &[],
                begin: 0,
                end: 0,
            }),
        }
    }

    /// Assigns every worker its block of `slice`. Coordinator-side, before
    /// any worker pops.
    pub fn push_initial(&self, slice: &'a [T]) {
        let num = active_threads();
        let len = slice.len();
        let per = (len + num - 1) / num;
        for worker in 0..num {
            self.cursors.with_slot(worker, |c| {
                c.slice = slice;
                c.begin = (per * worker).min(len);
                c.end = (per * worker + per).min(len);
            });
        }
    }
}

impl<'a, T> Default for StaticRandomAccessRange<'a, T> {
    fn default() -> Self {
        StaticRandomAccessRange::new()
    }
}

impl<'a, T: Copy> Worklist<T> for StaticRandomAccessRange<'a, T> {
    fn push(&self, _item: T) {
        reject_push("StaticRandomAccessRange");
    }

    fn push_many<I>(&self, _items: I)
    where
        I: IntoIterator<Item = T>,
    {
        reject_push("StaticRandomAccessRange");
    }

    fn pop(&self) -> Option<T> {
        self.cursors.with_mine(|c| {
            if c.begin < c.end {
                let item = c.slice[c.begin];
                c.begin += 1;
                Some(item)
            } else {
                None
            }
        })
    }
}
