//! Owner-computes distribution.
//!
//! An owner function assigns every item a home worker. Pushes for the
//! current worker go straight to its queue; pushes for anyone else land in
//! a per-owner buffer that the owner folds into its queue the next time its
//! own queue runs dry. Pops never cross workers, so each item is executed
//! where its owner decided.

use std::marker::PhantomData;

use crate::contract::Worklist;
use crate::percpu::PerThread;
use crate::simple::Lifo;

/// Maps an item to the worker that must execute it.
///
/// Implemented for any `Fn(&T) -> usize`; the returned key is folded onto
/// the worker slot array, so it does not need to be in range. The folded
/// slot must belong to a worker that pops, or the item waits in that
/// slot's buffer until one does.
pub trait OwnerFn<T> {
    fn owner(&self, item: &T) -> usize;
}

impl<T, F> OwnerFn<T> for F
where
    F: Fn(&T) -> usize,
{
    fn owner(&self, item: &T) -> usize {
        self(item)
    }
}

/// Routes each item to the worker computed by `F`.
///
/// `W` is the per-worker queue; the transfer buffers are plain concurrent
/// [`Lifo`]s because they only ever see cross-worker handoffs.
pub struct OwnerComputes<T, F, W = Lifo<T>> {
    owner: F,
    items: PerThread<W>,
    buffers: PerThread<Lifo<T>>,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T, F, W: Default> OwnerComputes<T, F, W> {
    pub fn new(owner: F) -> Self {
        OwnerComputes {
            owner,
            items: PerThread::new(|_| W::default()),
            buffers: PerThread::new(|_| Lifo::new()),
            _marker: PhantomData,
        }
    }
}

impl<T, F, W> OwnerComputes<T, F, W>
where
    F: OwnerFn<T>,
{
    /// Folds the owner key onto the slot array with the same mapping the
    /// pop side uses, so a worker always matches the slots it drains.
    fn slot_for(&self, item: &T) -> usize {
        self.items.effective_id_for(self.owner.owner(item))
    }
}

impl<T, F, W> Worklist<T> for OwnerComputes<T, F, W>
where
    F: OwnerFn<T>,
    W: Worklist<T>,
{
    fn push(&self, item: T) {
        let slot = self.slot_for(&item);
        if slot == self.items.my_effective_id() {
            self.items.get(slot).push(item);
        } else {
            self.buffers.get(slot).push(item);
        }
    }

    fn pop(&self) -> Option<T> {
        let mine = self.items.mine();
        if let Some(item) = mine.pop() {
            return Some(item);
        }

        // Queue ran dry: fold in whatever other workers buffered for us.
        let buffer = self.buffers.mine();
        let mut delivered = false;
        while let Some(item) = buffer.pop() {
            mine.push(item);
            delivered = true;
        }
        if delivered {
            mine.pop()
        } else {
            None
        }
    }
}
