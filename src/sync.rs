//! Threading disciplines: the type-level switch between shared and
//! single-threaded containers.
//!
//! A worklist parameterised by [`Concurrent`] guards its state with a real
//! lock and is `Sync`; the same worklist parameterised by [`Sequential`]
//! uses a `RefCell` instead and is `!Sync`, so handing it to another thread
//! is rejected at compile time. This is how "rethreading" a container to a
//! known-single-threaded context is expressed.

use std::cell::RefCell;

use parking_lot::Mutex;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Concurrent {}
    impl Sealed for super::Sequential {}
}

/// Interior-mutability cell selected by a [`Threading`] discipline.
pub trait StateCell<T> {
    fn new(value: T) -> Self;

    /// Runs `f` with exclusive access to the guarded state.
    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

/// Selects how a container guards its internal state.
pub trait Threading: sealed::Sealed + 'static {
    type Cell<T>: StateCell<T>;
}

/// Multi-threaded discipline: state behind a mutex, containers are `Sync`.
pub struct Concurrent;

/// Single-threaded discipline: state behind a `RefCell`, containers are
/// `!Sync` and therefore cannot be shared across threads at all.
///
/// ```compile_fail
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<worklist::Lifo<usize, worklist::Sequential>>();
/// ```
pub struct Sequential;

impl Threading for Concurrent {
    type Cell<T> = Mutex<T>;
}

impl Threading for Sequential {
    type Cell<T> = RefCell<T>;
}

impl<T> StateCell<T> for Mutex<T> {
    fn new(value: T) -> Self {
        Mutex::new(value)
    }

    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }
}

impl<T> StateCell<T> for RefCell<T> {
    fn new(value: T) -> Self {
        RefCell::new(value)
    }

    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.borrow_mut())
    }
}
