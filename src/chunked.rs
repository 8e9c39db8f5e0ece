//! Chunked bulk-transfer worklists.
//!
//! Workers batch items into privately owned chunks and exchange whole
//! chunks through lock-free bags, so the shared structures are touched once
//! per chunk instead of once per item. Each worker keeps two cursors: `next`
//! is the chunk being filled by pushes, `cur` the chunk being drained by
//! pops. A full `next` is published to a bag; an empty `cur` is recycled
//! and replaced by a claimed chunk.
//!
//! The bag is either one global container or one per package
//! (`DistChunkedFifo`/`DistChunkedLifo`); in the distributed layout a
//! worker that finds its own package's bag empty scans the other packages
//! `[id+1..]` then `[..id]`, claiming the first chunk it finds.
//!
//! A chunk is referenced by exactly one holder at a time: a worker's
//! cursor, or a bag. Ownership moves as `Box`es, so the invariant is
//! enforced by the type system rather than a protocol.

use crossbeam::queue::SegQueue;

use crate::chunk::{Chunk, ChunkPool};
use crate::contract::Worklist;
use crate::metrics::count;
use crate::percpu::{OwnedPerThread, PerPackage};
use crate::stack::LockFreeStack;

/// A lock-free MPMC container of published chunks.
///
/// The queue flavor hands chunks out oldest-first, the stack flavor
/// newest-first; the enclosing policy picks whichever matches its drain
/// order.
pub trait ChunkBag<T>: Default {
    fn push(&self, item: T);
    fn pop(&self) -> Option<T>;
}

impl<T> ChunkBag<T> for SegQueue<T> {
    fn push(&self, item: T) {
        SegQueue::push(self, item);
    }

    fn pop(&self) -> Option<T> {
        SegQueue::pop(self)
    }
}

impl<T: Send> ChunkBag<T> for LockFreeStack<T> {
    fn push(&self, item: T) {
        LockFreeStack::push(self, item);
    }

    fn pop(&self) -> Option<T> {
        LockFreeStack::pop(self)
    }
}

/// How the chunk bags are laid out: one shared bag, or one per package.
pub trait BagSet: Default {
    type Bag;

    fn get(&self, i: usize) -> &Self::Bag;
    fn my_effective_id(&self) -> usize;
    fn len(&self) -> usize;

    fn mine(&self) -> &Self::Bag {
        self.get(self.my_effective_id())
    }
}

/// A single bag shared by every worker.
#[derive(Default)]
pub struct GlobalBag<B> {
    bag: B,
}

impl<B: Default> BagSet for GlobalBag<B> {
    type Bag = B;

    fn get(&self, _i: usize) -> &B {
        &self.bag
    }

    fn my_effective_id(&self) -> usize {
        0
    }

    fn len(&self) -> usize {
        1
    }
}

/// One bag per package; claims prefer the local package and steal from the
/// others on miss.
pub struct PackageBags<B> {
    bags: PerPackage<B>,
}

impl<B: Default> Default for PackageBags<B> {
    fn default() -> Self {
        PackageBags {
            bags: PerPackage::new(|_| B::default()),
        }
    }
}

impl<B: Default> BagSet for PackageBags<B> {
    type Bag = B;

    fn get(&self, i: usize) -> &B {
        self.bags.get(i)
    }

    fn my_effective_id(&self) -> usize {
        self.bags.my_effective_id()
    }

    fn len(&self) -> usize {
        self.bags.len()
    }
}

struct Cursors<T, const N: usize> {
    cur: Option<Box<Chunk<T, N>>>,
    next: Option<Box<Chunk<T, N>>>,
}

/// Bulk-transfer worklist parameterised by bag layout `Q`, drain direction
/// `STACK` and chunk capacity `N`.
///
/// With `STACK = false`, chunks drain front-to-back through the `cur`
/// cursor and an empty worker promotes its own `next` before giving up
/// (FIFO within a chunk). With `STACK = true`, the worker treats `next`
/// alone as a stack (LIFO within a chunk). Between chunks the order is the
/// bag's; across workers there is no ordering guarantee.
///
/// The lock-free paths are equally safe under a single thread, so
/// rethreading this family is the identity: there is no lock to elide.
pub struct ChunkedMaster<T, Q, const STACK: bool, const N: usize = 64> {
    pool: ChunkPool<T, N>,
    cursors: OwnedPerThread<Cursors<T, N>>,
    bags: Q,
}

/// Global queue of chunks, FIFO drain.
pub type ChunkedFifo<T, const N: usize = 64> =
    ChunkedMaster<T, GlobalBag<SegQueue<Box<Chunk<T, N>>>>, false, N>;

/// Global stack of chunks, LIFO drain.
pub type ChunkedLifo<T, const N: usize = 64> =
    ChunkedMaster<T, GlobalBag<LockFreeStack<Box<Chunk<T, N>>>>, true, N>;

/// Per-package queues of chunks, FIFO drain, cross-package stealing.
pub type DistChunkedFifo<T, const N: usize = 64> =
    ChunkedMaster<T, PackageBags<SegQueue<Box<Chunk<T, N>>>>, false, N>;

/// Per-package stacks of chunks, LIFO drain, cross-package stealing.
pub type DistChunkedLifo<T, const N: usize = 64> =
    ChunkedMaster<T, PackageBags<LockFreeStack<Box<Chunk<T, N>>>>, true, N>;

impl<T, Q: Default, const STACK: bool, const N: usize> ChunkedMaster<T, Q, STACK, N> {
    pub fn new() -> Self {
        ChunkedMaster {
            pool: ChunkPool::new(),
            cursors: OwnedPerThread::new(|_| Cursors {
                cur: None,
                next: None,
            }),
            bags: Q::default(),
        }
    }
}

impl<T, Q: Default, const STACK: bool, const N: usize> Default for ChunkedMaster<T, Q, STACK, N> {
    fn default() -> Self {
        ChunkedMaster::new()
    }
}

impl<T, Q, const STACK: bool, const N: usize> ChunkedMaster<T, Q, STACK, N>
where
    Q: BagSet,
    Q::Bag: ChunkBag<Box<Chunk<T, N>>>,
{
    fn publish_chunk(&self, chunk: Box<Chunk<T, N>>) {
        count!(chunks_published);
        self.bags.mine().push(chunk);
    }

    /// Claims a chunk, preferring the local bag and then walking every
    /// other bag exactly once.
    fn claim_chunk(&self) -> Option<Box<Chunk<T, N>>> {
        let id = self.bags.my_effective_id();
        if let Some(chunk) = self.bags.get(id).pop() {
            count!(chunks_claimed);
            return Some(chunk);
        }

        for i in (id + 1)..self.bags.len() {
            if let Some(chunk) = self.bags.get(i).pop() {
                count!(chunk_steals);
                return Some(chunk);
            }
        }
        for i in 0..id {
            if let Some(chunk) = self.bags.get(i).pop() {
                count!(chunk_steals);
                return Some(chunk);
            }
        }

        None
    }
}

impl<T, Q, const STACK: bool, const N: usize> Worklist<T> for ChunkedMaster<T, Q, STACK, N>
where
    Q: BagSet,
    Q::Bag: ChunkBag<Box<Chunk<T, N>>>,
{
    fn push(&self, item: T) {
        self.cursors.with_mine(|c| {
            let item = match c.next.as_mut() {
                Some(next) => match next.push_back(item) {
                    Ok(()) => return,
                    Err(item) => {
                        if let Some(full) = c.next.take() {
                            self.publish_chunk(full);
                        }
                        item
                    }
                },
                None => item,
            };

            let mut fresh = self.pool.alloc();
            if fresh.push_back(item).is_err() {
                unreachable!("fresh chunk rejected its first item");
            }
            c.next = Some(fresh);
        });
    }

    fn pop(&self) -> Option<T> {
        self.cursors.with_mine(|c| {
            if STACK {
                if let Some(next) = c.next.as_mut() {
                    if let Some(item) = next.pop_back() {
                        return Some(item);
                    }
                }
                if let Some(drained) = c.next.take() {
                    self.pool.recycle(drained);
                }
                c.next = self.claim_chunk();
                c.next.as_mut().and_then(|chunk| chunk.pop_back())
            } else {
                if let Some(cur) = c.cur.as_mut() {
                    if let Some(item) = cur.pop_front() {
                        return Some(item);
                    }
                }
                if let Some(drained) = c.cur.take() {
                    self.pool.recycle(drained);
                }
                c.cur = self.claim_chunk();
                if c.cur.is_none() {
                    // Nothing published anywhere: fall back to the chunk
                    // this worker is still filling.
                    c.cur = c.next.take();
                }
                c.cur.as_mut().and_then(|chunk| chunk.pop_front())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    // Unit tests here run single-worker on a spawned thread; the
    // multi-worker scenarios live in the integration tests.
    use crate::test_support::on_worker;

    #[test]
    fn fifo_drains_in_chunk_order() {
        on_worker(|| {
            let wl: ChunkedFifo<usize, 4> = ChunkedFifo::new();
            wl.push_many(0..10);
            // Single worker: full chunks go through the global queue in
            // publish order, the live `next` chunk drains last.
            let popped: Vec<usize> = std::iter::from_fn(|| wl.pop()).collect();
            assert_eq!(popped, (0..10).collect::<Vec<_>>());
        });
    }

    #[test]
    fn lifo_drains_newest_first() {
        on_worker(|| {
            let wl: ChunkedLifo<usize, 4> = ChunkedLifo::new();
            wl.push_many(0..4);
            assert_eq!(wl.pop(), Some(3));
            assert_eq!(wl.pop(), Some(2));
            wl.push(9);
            assert_eq!(wl.pop(), Some(9));
            assert_eq!(wl.pop(), Some(1));
            assert_eq!(wl.pop(), Some(0));
            assert_eq!(wl.pop(), None);
        });
    }

    #[test]
    fn single_item_chunks_conserve() {
        on_worker(|| {
            let wl: ChunkedFifo<usize, 1> = ChunkedFifo::new();
            wl.push_many(0..100);
            let mut seen = vec![false; 100];
            while let Some(v) = wl.pop() {
                assert!(!seen[v]);
                seen[v] = true;
            }
            assert!(seen.into_iter().all(|s| s));
        });
    }

    #[test]
    fn distributed_variant_conserves() {
        on_worker(|| {
            let wl: DistChunkedLifo<usize, 8> = DistChunkedLifo::new();
            wl.push_many(0..50);
            let mut seen = vec![false; 50];
            while let Some(v) = wl.pop() {
                assert!(!seen[v]);
                seen[v] = true;
            }
            assert!(seen.into_iter().all(|s| s));
        });
    }

    #[test]
    fn empty_pop_is_none_and_stays_usable() {
        on_worker(|| {
            let wl: ChunkedFifo<usize, 2> = ChunkedFifo::new();
            assert_eq!(wl.pop(), None);
            wl.push(7);
            assert_eq!(wl.pop(), Some(7));
            assert_eq!(wl.pop(), None);
            wl.push(8);
            assert_eq!(wl.pop(), Some(8));
        });
    }
}
