//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::{EntryGuard, NestedEntries, ResolutionStack};
pub(crate) use dispose_bag::{release_all, DisposeBag};
