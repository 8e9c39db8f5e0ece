//! Thread-local queues with a shared spill.
//!
//! Pushes land in an unsynchronized per-thread worklist; pops drain it and
//! fall back to a shared one. The initial seed goes to the shared side so
//! every worker can pull start-up work from it. Ordering between the two
//! sides is unspecified.

use std::marker::PhantomData;

use crate::contract::Worklist;
use crate::percpu::OwnedPerThread;
use crate::simple::Fifo;
use crate::sync::Sequential;

/// Per-thread inner worklist `L` plus shared outer worklist `G`.
///
/// `L` should use the [`Sequential`] discipline: each instance is owned by
/// one worker, so it needs no lock at all.
pub struct LocalQueues<T, G = Fifo<T>, L = Fifo<T, Sequential>> {
    local: OwnedPerThread<L>,
    global: G,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T, G: Default, L: Default> LocalQueues<T, G, L> {
    pub fn new() -> Self {
        LocalQueues {
            local: OwnedPerThread::new(|_| L::default()),
            global: G::default(),
            _marker: PhantomData,
        }
    }
}

impl<T, G: Default, L: Default> Default for LocalQueues<T, G, L> {
    fn default() -> Self {
        LocalQueues::new()
    }
}

impl<T, G, L> Worklist<T> for LocalQueues<T, G, L>
where
    G: Worklist<T>,
    L: Worklist<T>,
{
    fn push(&self, item: T) {
        self.local.with_mine(|l| l.push(item));
    }

    fn push_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.local.with_mine(|l| l.push_many(items));
    }

    fn push_initial<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.global.push_initial(items);
    }

    fn pop(&self) -> Option<T> {
        self.local
            .with_mine(|l| l.pop())
            .or_else(|| self.global.pop())
    }
}
