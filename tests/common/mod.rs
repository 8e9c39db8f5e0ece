//! Shared driver for multi-worker integration tests.
//!
//! Tests inside one binary run concurrently on threads of one process, and
//! worker ids are process-global, so every test that registers workers is
//! serialized through `run_workers`.

use lazy_static::lazy_static;
use parking_lot::Mutex;

use worklist::{register_worker, set_active_threads, topology};

lazy_static! {
    static ref SERIAL: Mutex<()> = Mutex::new(());
}

/// Runs `f(worker_id)` on `n` registered workers concurrently and returns
/// each worker's result in worker order.
pub fn run_workers<R: Send>(n: usize, f: impl Fn(usize) -> R + Sync) -> Vec<R> {
    let _serial = SERIAL.lock();
    set_active_threads(n);
    let results = std::thread::scope(|s| {
        let handles: Vec<_> = (0..n)
            .map(|tid| {
                let f = &f;
                s.spawn(move || {
                    let _guard = register_worker(tid);
                    f(tid)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });
    set_active_threads(topology().max_threads());
    results
}

/// Asserts that the popped values are exactly `0..n`, each exactly once.
#[allow(dead_code)]
pub fn assert_exactly_once(popped: impl IntoIterator<Item = usize>, n: usize) {
    let mut seen = vec![false; n];
    for v in popped {
        assert!(v < n, "popped out-of-range item {}", v);
        assert!(!seen[v], "item {} popped twice", v);
        seen[v] = true;
    }
    let missing: Vec<usize> = seen
        .iter()
        .enumerate()
        .filter(|(_, s)| !**s)
        .map(|(i, _)| i)
        .collect();
    assert!(missing.is_empty(), "items never popped: {:?}", missing);
}
