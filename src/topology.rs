//! Worker identities and machine topology.
//!
//! The crate never spawns threads. An external pool owns the workers; each
//! worker thread registers itself here once (receiving a [`WorkerGuard`])
//! and every worklist operation reads the registration to find "my" slot in
//! the per-thread and per-package storage. Packages group workers by NUMA
//! node and bound the locality-aware stealing policies.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_static::lazy_static;
use parking_lot::Mutex;

/// Worker slots provisioned even on small machines, so that a pool may
/// oversubscribe logical workers beyond the physical core count.
const MIN_WORKER_SLOTS: usize = 16;

/// Static description of the machine: how many worker slots exist and which
/// package (NUMA node) each slot belongs to.
#[derive(Debug, Clone)]
pub struct Topology {
    slot_package: Vec<usize>,
    num_packages: usize,
}

impl Topology {
    /// Detects the topology once per process.
    ///
    /// Conservative NUMA detection that prioritizes safety over accuracy:
    /// it defaults to a single package unless the core count strongly
    /// suggests multiple nodes. A false single-node answer only costs
    /// locality; a false multi-node answer would skew stealing.
    fn detect() -> Self {
        use sysinfo::{CpuRefreshKind, System};

        let mut system = System::new();
        system.refresh_cpu_specifics(CpuRefreshKind::everything());

        let num_cores = system.cpus().len().max(num_cpus::get()).max(1);
        let estimated_packages = if num_cores > 32 {
            (num_cores / 16).clamp(1, 4)
        } else {
            1
        };

        let slots = num_cores.max(MIN_WORKER_SLOTS);
        let slot_package = (0..slots).map(|i| i % estimated_packages).collect();

        Topology {
            slot_package,
            num_packages: estimated_packages,
        }
    }

    /// Number of worker slots (upper bound on concurrently registered
    /// workers).
    pub fn max_threads(&self) -> usize {
        self.slot_package.len()
    }

    /// Number of packages (NUMA nodes) the slots are spread over.
    pub fn num_packages(&self) -> usize {
        self.num_packages
    }

    /// Package id of a worker slot.
    pub fn package_of(&self, worker: usize) -> usize {
        self.slot_package[worker % self.slot_package.len()]
    }

    /// Highest package id in use by workers `0..=worker`.
    pub fn max_package_for(&self, worker: usize) -> usize {
        let last = worker.min(self.slot_package.len() - 1);
        self.slot_package[..=last].iter().copied().max().unwrap_or(0)
    }
}

lazy_static! {
    static ref TOPOLOGY: Topology = Topology::detect();
    static ref CLAIMED: Mutex<Vec<bool>> = Mutex::new(vec![false; TOPOLOGY.max_threads()]);
}

/// Worker count for the current parallel region; 0 means "not set", in
/// which case every slot is considered active.
static ACTIVE_THREADS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static WORKER_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

/// The process-wide topology.
pub fn topology() -> &'static Topology {
    &TOPOLOGY
}

/// Number of workers participating in the current parallel region.
///
/// Policies read this at operation time; changing it in the middle of a
/// region is undefined, so set it between regions only.
pub fn active_threads() -> usize {
    match ACTIVE_THREADS.load(Ordering::Relaxed) {
        0 => topology().max_threads(),
        n => n,
    }
}

/// Declares how many workers the next parallel region will use.
///
/// # Panics
///
/// Panics if `n` is zero or exceeds the number of worker slots.
pub fn set_active_threads(n: usize) {
    assert!(n > 0, "a parallel region needs at least one worker");
    assert!(
        n <= topology().max_threads(),
        "{} workers requested but only {} slots exist",
        n,
        topology().max_threads()
    );
    ACTIVE_THREADS.store(n, Ordering::Relaxed);
}

/// RAII registration of the current thread as worker `id`.
///
/// Dropping the guard releases the slot. The guard is deliberately not
/// `Send`: the registration belongs to the thread that made it.
pub struct WorkerGuard {
    id: usize,
    _not_send: PhantomData<*const ()>,
}

impl WorkerGuard {
    /// The registered worker id.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        WORKER_ID.with(|w| w.set(None));
        CLAIMED.lock()[self.id] = false;
    }
}

/// Registers the current thread as worker `id` for the duration of the
/// returned guard.
///
/// # Panics
///
/// Panics if `id` is out of range, already claimed by another thread, or if
/// this thread is already registered. All three are programming errors in
/// the owning pool.
pub fn register_worker(id: usize) -> WorkerGuard {
    let topo = topology();
    assert!(
        id < topo.max_threads(),
        "worker id {} out of range (0..{})",
        id,
        topo.max_threads()
    );

    {
        let mut claimed = CLAIMED.lock();
        assert!(!claimed[id], "worker id {} is already registered", id);
        claimed[id] = true;
    }

    WORKER_ID.with(|w| {
        assert!(
            w.get().is_none(),
            "thread is already registered as worker {}",
            w.get().unwrap_or(0)
        );
        w.set(Some(id));
    });

    WorkerGuard {
        id,
        _not_send: PhantomData,
    }
}

/// Worker id of the current thread.
///
/// # Panics
///
/// Panics if the current thread never registered; worklists are only usable
/// from registered workers.
pub fn current_worker() -> usize {
    WORKER_ID
        .with(|w| w.get())
        .expect("worklist used on a thread that is not a registered worker")
}

/// Package id of the current worker.
pub fn my_package() -> usize {
    topology().package_of(current_worker())
}

/// Round-robin successor of the current worker among `active` workers; the
/// steal victim of choice for the local-stealing policy.
pub fn next_worker(active: usize) -> usize {
    (current_worker() + 1) % active.max(1)
}
