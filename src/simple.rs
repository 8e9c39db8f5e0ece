//! The simple worklists: a locked deque popped from either end.
//!
//! These are the correctness references for everything else in the crate
//! and the default inner containers of the composite policies. Performance
//! is secondary to being obviously right.

use std::collections::VecDeque;

use crate::contract::Worklist;
use crate::sync::{Concurrent, StateCell, Threading};

/// Last-in, first-out worklist.
///
/// Strict LIFO for a single worker; linearisable but unordered between
/// producers when shared.
pub struct Lifo<T, C: Threading = Concurrent> {
    deque: C::Cell<VecDeque<T>>,
}

impl<T, C: Threading> Lifo<T, C> {
    pub fn new() -> Self {
        Lifo {
            deque: StateCell::new(VecDeque::new()),
        }
    }
}

impl<T, C: Threading> Default for Lifo<T, C> {
    fn default() -> Self {
        Lifo::new()
    }
}

impl<T, C: Threading> Worklist<T> for Lifo<T, C> {
    fn push(&self, item: T) {
        self.deque.with(|d| d.push_back(item));
    }

    fn push_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        // One lock acquisition for the whole sequence.
        self.deque.with(|d| d.extend(items));
    }

    fn pop(&self) -> Option<T> {
        self.deque.with(|d| d.pop_back())
    }
}

/// First-in, first-out worklist.
///
/// Strict FIFO for a single worker; linearisable but unordered between
/// producers when shared.
pub struct Fifo<T, C: Threading = Concurrent> {
    deque: C::Cell<VecDeque<T>>,
}

impl<T, C: Threading> Fifo<T, C> {
    pub fn new() -> Self {
        Fifo {
            deque: StateCell::new(VecDeque::new()),
        }
    }
}

impl<T, C: Threading> Default for Fifo<T, C> {
    fn default() -> Self {
        Fifo::new()
    }
}

impl<T, C: Threading> Worklist<T> for Fifo<T, C> {
    fn push(&self, item: T) {
        self.deque.with(|d| d.push_back(item));
    }

    fn push_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.deque.with(|d| d.extend(items));
    }

    fn pop(&self) -> Option<T> {
        self.deque.with(|d| d.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::Sequential;

    #[test]
    fn lifo_pops_in_reverse_order() {
        let wl: Lifo<usize> = Lifo::new();
        wl.push(1);
        wl.push(2);
        wl.push(3);
        assert_eq!(wl.pop(), Some(3));
        assert_eq!(wl.pop(), Some(2));
        assert_eq!(wl.pop(), Some(1));
        assert_eq!(wl.pop(), None);
    }

    #[test]
    fn fifo_pops_in_push_order() {
        let wl: Fifo<usize> = Fifo::new();
        wl.push_many(0..5);
        for i in 0..5 {
            assert_eq!(wl.pop(), Some(i));
        }
        assert_eq!(wl.pop(), None);
    }

    #[test]
    fn push_initial_matches_push_many() {
        let a: Fifo<usize> = Fifo::new();
        let b: Fifo<usize> = Fifo::new();
        a.push_initial(0..10);
        b.push_many(0..10);
        for _ in 0..10 {
            assert_eq!(a.pop(), b.pop());
        }
        assert_eq!(a.pop(), None);
        assert_eq!(b.pop(), None);
    }

    #[test]
    fn retyped_and_rethreaded_still_conserves() {
        // The same policy over a different item type with the
        // single-threaded discipline: the generics are the retype and
        // rethread operations.
        let wl: Lifo<String, Sequential> = Lifo::new();
        wl.push_many((0..20).map(|i| i.to_string()));
        let mut popped: Vec<String> = std::iter::from_fn(|| wl.pop()).collect();
        popped.sort_by_key(|s| s.parse::<usize>().unwrap());
        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(popped, expected);
    }

    #[test]
    fn concurrent_producers_conserve() {
        use std::sync::Arc;

        let wl: Arc<Fifo<usize>> = Arc::new(Fifo::new());
        let mut handles = Vec::new();
        for t in 0..4 {
            let wl = Arc::clone(&wl);
            handles.push(std::thread::spawn(move || {
                for i in 0..500 {
                    wl.push(t * 500 + i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = vec![false; 2000];
        while let Some(v) = wl.pop() {
            assert!(!seen[v], "item {} popped twice", v);
            seen[v] = true;
        }
        assert!(seen.into_iter().all(|s| s));
    }
}
