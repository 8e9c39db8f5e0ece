//! # Worklist - Composable Concurrent Worklists
//!
//! A family of concurrent containers for data-parallel runtimes in which
//! worker threads repeatedly pop work items, run an operator on each, and
//! push any items the operator generates. The worklist *is* the scheduler:
//! choosing a policy chooses load balance, locality and priority order.
//!
//! ## Architecture
//!
//! All policies conform to one contract ([`Worklist`]): `push`, `push_many`,
//! `push_initial`, and a non-blocking `pop` that returns `None` when nothing
//! is available right now. On top of that contract the crate provides:
//!
//! - **Simple**: [`Lifo`] and [`Fifo`], locked deques and the correctness
//!   references.
//! - **Chunked**: [`ChunkedFifo`], [`ChunkedLifo`] and their per-package
//!   variants [`DistChunkedFifo`], [`DistChunkedLifo`] - bulk transfer of
//!   fixed-capacity chunks through lock-free bags.
//! - **Composite**: [`LocalQueues`] (thread-local with shared spill),
//!   [`LocalStealing`] and [`LevelStealing`] (neighbor stealing at thread
//!   and package granularity), [`OwnerComputes`] (route items to a computed
//!   home worker).
//! - **Priority**: [`OrderedByIntegerMetric`], lazily created buckets keyed
//!   by a user indexer, served lowest-key-first per worker.
//! - **Ranges**: [`RandomAccessRange`], [`ForwardAccessRange`],
//!   [`StaticRandomAccessRange`] - read-only partitions of an existing
//!   slice, with package-level stealing in the random-access case.
//!
//! The crate never spawns threads. An external pool registers each of its
//! workers ([`register_worker`]) and declares the region width
//! ([`set_active_threads`]); the policies use the registration to find
//! their padded per-thread and per-package slots.
//!
//! ## Example
//!
//! ```
//! use worklist::{register_worker, set_active_threads, ChunkedFifo, Worklist};
//!
//! set_active_threads(1);
//! let _guard = register_worker(0);
//!
//! let wl: ChunkedFifo<usize> = ChunkedFifo::new();
//! wl.push_initial(0..100);
//!
//! let mut processed = 0;
//! while let Some(_item) = wl.pop() {
//!     // run the operator; it may wl.push(...) new work
//!     processed += 1;
//! }
//! assert_eq!(processed, 100);
//! ```

pub mod chunk;
pub mod chunked;
pub mod contract;
pub mod local_queues;
pub mod metrics;
pub mod ordered;
pub mod owner;
pub mod percpu;
pub mod range;
pub mod simple;
pub mod stack;
pub mod stealing;
pub mod sync;
pub mod topology;

pub use chunked::{ChunkedFifo, ChunkedLifo, ChunkedMaster, DistChunkedFifo, DistChunkedLifo};
pub use contract::Worklist;
pub use local_queues::LocalQueues;
pub use ordered::{Indexer, OrderedByIntegerMetric};
pub use owner::{OwnerComputes, OwnerFn};
pub use range::{ForwardAccessRange, RandomAccessRange, StaticRandomAccessRange};
pub use simple::{Fifo, Lifo};
pub use stealing::{LevelStealing, LocalStealing};
pub use sync::{Concurrent, Sequential, Threading};
pub use topology::{
    active_threads, register_worker, set_active_threads, topology, Topology, WorkerGuard,
};

#[cfg(test)]
pub(crate) mod test_support {
    //! Unit tests share one process, so every test that registers a worker
    //! id is serialized here to keep the slots from colliding.

    use lazy_static::lazy_static;
    use parking_lot::{Mutex, MutexGuard};

    use crate::topology::{register_worker, set_active_threads, topology};

    lazy_static! {
        static ref SERIAL: Mutex<()> = Mutex::new(());
    }

    pub(crate) fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock()
    }

    /// Runs `f` on a spawned thread registered as worker 0.
    pub(crate) fn on_worker<R: Send>(f: impl FnOnce() -> R + Send) -> R {
        let _serial = serial();
        std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = register_worker(0);
                f()
            })
            .join()
            .unwrap()
        })
    }

    /// Like [`on_worker`], but with the region width pinned to one worker,
    /// which the range policies need for exhaustive single-thread drains.
    pub(crate) fn on_solo_worker<R: Send>(f: impl FnOnce() -> R + Send) -> R {
        struct RestoreWidth;
        impl Drop for RestoreWidth {
            fn drop(&mut self) {
                set_active_threads(topology().max_threads());
            }
        }

        let _serial = serial();
        let _restore = RestoreWidth;
        set_active_threads(1);
        std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = register_worker(0);
                f()
            })
            .join()
            .unwrap()
        })
    }
}
