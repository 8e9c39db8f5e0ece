#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "metrics")]
use std::time::Instant;

/// Optional performance metrics for the worklist policies.
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct Metrics {
    /// Chunks taken from the global allocator.
    pub chunks_allocated: AtomicU64,
    /// Chunks returned to the pool after draining.
    pub chunks_recycled: AtomicU64,
    /// Full chunks published to a chunk bag.
    pub chunks_published: AtomicU64,
    /// Chunks claimed from the caller's own bag.
    pub chunks_claimed: AtomicU64,
    /// Chunks claimed from another package's bag.
    pub chunk_steals: AtomicU64,
    /// Successful pops from a neighboring worker's queue.
    pub neighbor_steals_success: AtomicU64,
    /// Failed pops from a neighboring worker's queue.
    pub neighbor_steals_failed: AtomicU64,
    /// Successful pops from another package's queue.
    pub package_steals_success: AtomicU64,
    /// Failed full scans over other packages' queues.
    pub package_steals_failed: AtomicU64,
    /// Halvings of the global residue by the random-access range.
    pub range_global_steals: AtomicU64,
    /// Blocks carved from a package slice by the random-access range.
    pub range_package_carves: AtomicU64,
    /// Priority buckets created.
    pub buckets_created: AtomicU64,
    /// Mirror catch-ups against the master log.
    pub mirror_syncs: AtomicU64,
    /// Time when metrics collection started.
    pub start_time: Instant,
}

#[cfg(feature = "metrics")]
impl Metrics {
    fn new() -> Self {
        Self {
            chunks_allocated: AtomicU64::new(0),
            chunks_recycled: AtomicU64::new(0),
            chunks_published: AtomicU64::new(0),
            chunks_claimed: AtomicU64::new(0),
            chunk_steals: AtomicU64::new(0),
            neighbor_steals_success: AtomicU64::new(0),
            neighbor_steals_failed: AtomicU64::new(0),
            package_steals_success: AtomicU64::new(0),
            package_steals_failed: AtomicU64::new(0),
            range_global_steals: AtomicU64::new(0),
            range_package_carves: AtomicU64::new(0),
            buckets_created: AtomicU64::new(0),
            mirror_syncs: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Returns a snapshot of current metrics values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chunks_allocated: self.chunks_allocated.load(Ordering::Relaxed),
            chunks_recycled: self.chunks_recycled.load(Ordering::Relaxed),
            chunks_published: self.chunks_published.load(Ordering::Relaxed),
            chunks_claimed: self.chunks_claimed.load(Ordering::Relaxed),
            chunk_steals: self.chunk_steals.load(Ordering::Relaxed),
            neighbor_steals_success: self.neighbor_steals_success.load(Ordering::Relaxed),
            neighbor_steals_failed: self.neighbor_steals_failed.load(Ordering::Relaxed),
            package_steals_success: self.package_steals_success.load(Ordering::Relaxed),
            package_steals_failed: self.package_steals_failed.load(Ordering::Relaxed),
            range_global_steals: self.range_global_steals.load(Ordering::Relaxed),
            range_package_carves: self.range_package_carves.load(Ordering::Relaxed),
            buckets_created: self.buckets_created.load(Ordering::Relaxed),
            mirror_syncs: self.mirror_syncs.load(Ordering::Relaxed),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(feature = "metrics")]
lazy_static::lazy_static! {
    static ref METRICS: Metrics = Metrics::new();
}

/// The process-wide metrics instance.
#[cfg(feature = "metrics")]
pub fn global() -> &'static Metrics {
    &METRICS
}

/// Snapshot of metrics at a point in time.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub chunks_allocated: u64,
    pub chunks_recycled: u64,
    pub chunks_published: u64,
    pub chunks_claimed: u64,
    pub chunk_steals: u64,
    pub neighbor_steals_success: u64,
    pub neighbor_steals_failed: u64,
    pub package_steals_success: u64,
    pub package_steals_failed: u64,
    pub range_global_steals: u64,
    pub range_package_carves: u64,
    pub buckets_created: u64,
    pub mirror_syncs: u64,
    pub elapsed_seconds: f64,
}

#[cfg(feature = "metrics")]
impl MetricsSnapshot {
    /// Chunks still outstanding (allocated or claimed but not yet
    /// recycled); approximate under concurrent updates.
    pub fn chunks_outstanding(&self) -> i64 {
        self.chunks_allocated as i64 - self.chunks_recycled as i64
    }

    /// Fraction of chunk claims that crossed a package boundary.
    pub fn steal_ratio(&self) -> f64 {
        let total = self.chunks_claimed + self.chunk_steals;
        if total > 0 {
            self.chunk_steals as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Bumps one metrics counter; compiles to nothing without the `metrics`
/// feature.
macro_rules! count {
    ($field:ident) => {{
        #[cfg(feature = "metrics")]
        crate::metrics::global()
            .$field
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }};
}

pub(crate) use count;
