//! The common worklist contract.
//!
//! Every scheduling policy in this crate is a container of work items that
//! conforms to the same small surface: insert items, possibly from many
//! worker threads at once, and pop items until the container reports that
//! nothing is available right now.

/// A concurrent container of work items serving one or more worker threads.
///
/// Implementations differ only in their scheduling policy: which item a
/// `pop` prefers, and how items migrate between workers. The contract is
/// deliberately loose about ordering; each policy documents its own
/// guarantees.
///
/// # Semantics
///
/// - `push` may be called concurrently from any registered worker and never
///   blocks indefinitely.
/// - `pop` never blocks: `None` means "nothing available *now*", not
///   "finished". Termination is decided by the caller (typically by
///   consensus once every worker sees `None`).
/// - `push_initial` seeds the worklist exactly once before workers start.
///   Most policies treat it as `push_many`; the read-only range policies
///   partition ahead of time instead and panic on ordinary pushes.
/// - Every pushed item is returned by exactly one `pop`, provided workers
///   keep popping until all of them drain.
///
/// # Retype and rethread
///
/// The container types themselves are the type-level constructors: a
/// worklist over a different item type is the same generic instantiated at
/// `U`, and a worklist demoted to single-threaded use is the same generic
/// instantiated with the [`Sequential`](crate::sync::Sequential)
/// discipline. Sequential containers are `!Sync`, so accidentally sharing
/// one across threads is a compile error rather than a data race.
pub trait Worklist<T> {
    /// Inserts one item.
    fn push(&self, item: T);

    /// Inserts a finite sequence, equivalent in effect to repeated `push`.
    fn push_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        for item in items {
            self.push(item);
        }
    }

    /// Seeds the worklist before any worker starts popping.
    fn push_initial<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.push_many(items);
    }

    /// Removes some item, or returns `None` if nothing is available now.
    fn pop(&self) -> Option<T>;
}
