//! Priority-bucketed worklist driven by an integer indexer.
//!
//! Items with the same key share a bucket (an inner worklist); lower keys
//! are served first. Buckets are created lazily and recorded in an
//! append-only master log guarded by one lock. Every worker mirrors the log
//! into a private sorted map and syncs the mirror only when its version
//! lags, so the steady state of repeated pushes and pops on one key never
//! touches the lock.
//!
//! The priority is deliberately relaxed: a worker serves the lowest
//! non-empty bucket *it has seen*, which may lag pushes by other workers
//! until the next sync. There is no global monotonicity across workers.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::contract::Worklist;
use crate::metrics::count;
use crate::percpu::OwnedPerThread;
use crate::simple::Fifo;

/// Maps an item to its non-negative priority key; lower keys are served
/// first. Implemented for any `Fn(&T) -> usize`.
pub trait Indexer<T> {
    fn index(&self, item: &T) -> usize;
}

impl<T, F> Indexer<T> for F
where
    F: Fn(&T) -> usize,
{
    fn index(&self, item: &T) -> usize {
        self(item)
    }
}

/// A worker's private view of the bucket map.
struct Mirror<W> {
    /// Bucket of the focused key, if any; the push/pop fast path.
    current: Option<Arc<W>>,
    /// Key the worker is focused on.
    cur_key: usize,
    /// How much of the master log this mirror has absorbed.
    last_version: usize,
    /// Buckets known to this worker, sorted by key.
    local: BTreeMap<usize, Arc<W>>,
}

/// Priority-ordered worklist: buckets keyed by `I`, each bucket an inner
/// worklist `W`.
pub struct OrderedByIntegerMetric<T, W = Fifo<T>, I = fn(&T) -> usize> {
    /// Append-only; never reordered, never truncated. A bucket's position
    /// is its creation version.
    master_log: Mutex<Vec<(usize, Arc<W>)>>,
    master_version: AtomicUsize,
    indexer: I,
    mirrors: OwnedPerThread<Mirror<W>>,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T, W, I> OrderedByIntegerMetric<T, W, I>
where
    I: Indexer<T>,
{
    pub fn new(indexer: I) -> Self {
        OrderedByIntegerMetric {
            master_log: Mutex::new(Vec::new()),
            master_version: AtomicUsize::new(0),
            indexer,
            mirrors: OwnedPerThread::new(|_| Mirror {
                current: None,
                cur_key: 0,
                last_version: 0,
                local: BTreeMap::new(),
            }),
            _marker: PhantomData,
        }
    }
}

impl<T, W, I> OrderedByIntegerMetric<T, W, I> {
    /// Absorbs log entries the mirror has not seen yet. Caller holds the
    /// master lock.
    fn sync_mirror(&self, mirror: &mut Mirror<W>, log: &[(usize, Arc<W>)]) {
        while mirror.last_version < log.len() {
            let (key, bucket) = &log[mirror.last_version];
            mirror.local.insert(*key, Arc::clone(bucket));
            mirror.last_version += 1;
        }
    }

    /// Catches the mirror up if its version lags the master's.
    fn update_mirror(&self, mirror: &mut Mirror<W>) {
        if mirror.last_version != self.master_version.load(Ordering::Acquire) {
            count!(mirror_syncs);
            let log = self.master_log.lock();
            self.sync_mirror(mirror, &log);
        }
    }
}

impl<T, W, I> OrderedByIntegerMetric<T, W, I>
where
    W: Worklist<T> + Default,
{
    /// Finds the bucket for `key`, creating and logging it if no worker has
    /// pushed to that key before.
    fn bucket_for(&self, mirror: &mut Mirror<W>, key: usize) -> Arc<W> {
        if let Some(bucket) = mirror.local.get(&key) {
            return Arc::clone(bucket);
        }

        let mut log = self.master_log.lock();
        self.sync_mirror(mirror, &log);
        if let Some(bucket) = mirror.local.get(&key) {
            return Arc::clone(bucket);
        }

        count!(buckets_created);
        let bucket = Arc::new(W::default());
        log.push((key, Arc::clone(&bucket)));
        self.master_version.store(log.len(), Ordering::Release);
        mirror.local.insert(key, Arc::clone(&bucket));
        mirror.last_version = log.len();
        bucket
    }
}

impl<T, W, I> Worklist<T> for OrderedByIntegerMetric<T, W, I>
where
    W: Worklist<T> + Default,
    I: Indexer<T>,
{
    fn push(&self, item: T) {
        let key = self.indexer.index(&item);
        self.mirrors.with_mine(|mirror| {
            if key == mirror.cur_key {
                if let Some(current) = mirror.current.as_ref() {
                    current.push(item);
                    return;
                }
            }
            let bucket = self.bucket_for(mirror, key);
            bucket.push(item);
        });
    }

    fn pop(&self) -> Option<T> {
        self.mirrors.with_mine(|mirror| {
            if let Some(current) = mirror.current.as_ref() {
                if let Some(item) = current.pop() {
                    return Some(item);
                }
            }

            // Focused bucket ran dry: catch up on buckets other workers
            // created, then take the lowest key that yields an item.
            self.update_mirror(mirror);
            for (&key, bucket) in mirror.local.iter() {
                mirror.cur_key = key;
                mirror.current = Some(Arc::clone(bucket));
                if let Some(item) = bucket.pop() {
                    return Some(item);
                }
            }
            None
        })
    }
}
