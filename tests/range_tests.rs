//! Range worklists: full coverage with no duplicates, bulk `pop_range`
//! disjointness, strided traversal, static blocks.

mod common;

use std::sync::Barrier;

use common::{assert_exactly_once, run_workers};
use worklist::{ForwardAccessRange, RandomAccessRange, StaticRandomAccessRange, Worklist};

#[test]
fn random_access_covers_everything_with_four_workers() {
    let input: Vec<usize> = (0..100).collect();
    let range: RandomAccessRange<usize> = RandomAccessRange::new();
    let barrier = Barrier::new(4);

    let popped = run_workers(4, |_tid| {
        range.push_initial(&input);
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(v) = range.pop() {
            mine.push(v);
        }
        mine
    });

    assert_exactly_once(popped.into_iter().flatten(), 100);
}

#[test]
fn random_access_handles_ranges_smaller_than_the_worker_count() {
    let input: Vec<usize> = (0..5).collect();
    let range: RandomAccessRange<usize> = RandomAccessRange::new();
    let barrier = Barrier::new(8);

    let popped = run_workers(8, |_tid| {
        range.push_initial(&input);
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(v) = range.pop() {
            mine.push(v);
        }
        mine
    });

    assert_exactly_once(popped.into_iter().flatten(), 5);
}

#[test]
fn pop_range_slices_are_disjoint_and_exhaustive() {
    let input: Vec<usize> = (0..1000).collect();
    let range: RandomAccessRange<usize> = RandomAccessRange::new();
    let barrier = Barrier::new(4);

    let popped = run_workers(4, |_tid| {
        range.push_initial(&input);
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(block) = range.pop_range() {
            mine.extend_from_slice(block);
        }
        mine
    });

    assert_exactly_once(popped.into_iter().flatten(), 1000);
}

#[test]
fn forward_range_threads_stride_disjointly() {
    let input: Vec<usize> = (0..101).collect();
    let range: ForwardAccessRange<usize> = ForwardAccessRange::new();
    let barrier = Barrier::new(2);

    let popped = run_workers(2, |tid| {
        if tid == 0 {
            // Coordinator-side seeding staggers every worker's start.
            range.push_initial(&input);
        }
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(v) = range.pop() {
            mine.push(v);
        }
        mine
    });

    // Worker t sees exactly the positions congruent to t mod 2.
    for (tid, mine) in popped.iter().enumerate() {
        for v in mine {
            assert_eq!(v % 2, tid, "worker {} popped position {}", tid, v);
        }
    }
    assert_exactly_once(popped.into_iter().flatten(), 101);
}

#[test]
fn static_blocks_tile_the_range() {
    let input: Vec<usize> = (0..10).collect();
    let range: StaticRandomAccessRange<usize> = StaticRandomAccessRange::new();
    let barrier = Barrier::new(3);

    let popped = run_workers(3, |tid| {
        if tid == 0 {
            range.push_initial(&input);
        }
        barrier.wait();
        let mut mine = Vec::new();
        while let Some(v) = range.pop() {
            mine.push(v);
        }
        mine
    });

    // ceil(10 / 3) = 4 positions per worker, clipped at the end.
    assert_eq!(popped[0], vec![0, 1, 2, 3]);
    assert_eq!(popped[1], vec![4, 5, 6, 7]);
    assert_eq!(popped[2], vec![8, 9]);
}

#[test]
fn empty_input_drains_immediately() {
    let input: Vec<usize> = Vec::new();
    let range: RandomAccessRange<usize> = RandomAccessRange::new();

    let popped = run_workers(2, |_tid| {
        range.push_initial(&input);
        let mut mine = Vec::new();
        while let Some(v) = range.pop() {
            mine.push(v);
        }
        mine
    });

    assert!(popped.into_iter().flatten().next().is_none());
}
