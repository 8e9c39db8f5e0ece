//! Conservation across policies: every pushed item is popped exactly once,
//! no matter the chunk size, bag layout or number of workers.

mod common;

use std::sync::Barrier;

use common::{assert_exactly_once, run_workers};
use worklist::{
    ChunkedFifo, ChunkedLifo, DistChunkedFifo, DistChunkedLifo, LocalQueues, Worklist,
};

/// Two producers, tiny chunks: items cross the global bag constantly.
#[test]
fn chunked_fifo_two_workers_small_chunks() {
    let wl: ChunkedFifo<usize, 2> = ChunkedFifo::new();
    let barrier = Barrier::new(2);

    let popped = run_workers(2, |tid| {
        wl.push_many(tid * 10..(tid + 1) * 10);
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(v) = wl.pop() {
            mine.push(v);
        }
        mine
    });

    assert_exactly_once(popped.into_iter().flatten(), 20);
}

fn chunk_size_sweep<const N: usize>() {
    const WORKERS: usize = 4;
    const PER_WORKER: usize = 250;
    let wl: ChunkedFifo<usize, N> = ChunkedFifo::new();
    let barrier = Barrier::new(WORKERS);

    let popped = run_workers(WORKERS, |tid| {
        wl.push_many(tid * PER_WORKER..(tid + 1) * PER_WORKER);
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(v) = wl.pop() {
            mine.push(v);
        }
        mine
    });

    assert_exactly_once(popped.into_iter().flatten(), WORKERS * PER_WORKER);
}

#[test]
fn chunk_boundaries_are_transparent() {
    chunk_size_sweep::<1>();
    chunk_size_sweep::<2>();
    chunk_size_sweep::<64>();
    chunk_size_sweep::<1024>();
}

#[test]
fn chunked_lifo_conserves_under_contention() {
    let wl: ChunkedLifo<usize, 8> = ChunkedLifo::new();
    let barrier = Barrier::new(4);

    let popped = run_workers(4, |tid| {
        wl.push_many(tid * 100..(tid + 1) * 100);
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(v) = wl.pop() {
            mine.push(v);
        }
        mine
    });

    assert_exactly_once(popped.into_iter().flatten(), 400);
}

#[test]
fn distributed_chunked_variants_conserve() {
    let fifo: DistChunkedFifo<usize, 4> = DistChunkedFifo::new();
    let lifo: DistChunkedLifo<usize, 4> = DistChunkedLifo::new();
    let barrier = Barrier::new(4);

    let popped = run_workers(4, |tid| {
        fifo.push_many(tid * 50..(tid + 1) * 50);
        lifo.push_many(200 + tid * 50..200 + (tid + 1) * 50);
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(v) = fifo.pop() {
            mine.push(v);
        }
        while let Some(v) = lifo.pop() {
            mine.push(v);
        }
        mine
    });

    assert_exactly_once(popped.into_iter().flatten(), 400);
}

#[test]
fn local_queues_conserve_seed_and_pushes() {
    let wl: LocalQueues<usize> = LocalQueues::new();
    let barrier = Barrier::new(2);

    let popped = run_workers(2, |tid| {
        if tid == 0 {
            // One-time seed goes through the shared side.
            wl.push_initial(0..100);
        }
        barrier.wait();
        wl.push_many(100 + tid * 50..100 + (tid + 1) * 50);
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(v) = wl.pop() {
            mine.push(v);
        }
        mine
    });

    assert_exactly_once(popped.into_iter().flatten(), 200);
}

/// Seeding and pushing one item at a time are observationally equivalent
/// up to ordering: the drained multiset is the same.
#[test]
fn seed_equals_itemwise_pushes() {
    let seeded: ChunkedFifo<usize, 16> = ChunkedFifo::new();
    let pushed: ChunkedFifo<usize, 16> = ChunkedFifo::new();

    let popped = run_workers(1, |_| {
        seeded.push_initial(0..500);
        for v in 0..500 {
            pushed.push(v);
        }
        let mut a = Vec::new();
        while let Some(v) = seeded.pop() {
            a.push(v);
        }
        let mut b = Vec::new();
        while let Some(v) = pushed.pop() {
            b.push(v);
        }
        (a, b)
    });

    let (mut a, mut b) = popped.into_iter().next().unwrap();
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
    assert_exactly_once(a, 500);
}
