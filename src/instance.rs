//! Type-erased service instances.
//!
//! Every resolved value is stored as an `Arc<C>` for its contract `C` and
//! then erased behind `dyn Any`. Storing the `Arc<C>` rather than `C` keeps
//! trait objects (`Arc<dyn Job>`) and concrete types on the same path, and
//! keeps identity observable through [`Arc::ptr_eq`].

use std::any::Any;
use std::sync::Arc;

/// A type-erased, shareable service value.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Erases a shared value of contract type `C`.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::instance::{downcast, into_instance};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync { fn now(&self) -> u64; }
/// struct FixedClock;
/// impl Clock for FixedClock { fn now(&self) -> u64 { 7 } }
///
/// let clock: Arc<dyn Clock> = Arc::new(FixedClock);
/// let erased = into_instance(clock.clone());
///
/// let back = downcast::<dyn Clock>(&erased).unwrap();
/// assert!(Arc::ptr_eq(&clock, &back));
/// assert!(downcast::<String>(&erased).is_none());
/// ```
#[inline]
pub fn into_instance<C>(value: Arc<C>) -> Instance
where
    C: ?Sized + Send + Sync + 'static,
{
    Arc::new(value)
}

/// Recovers the `Arc<C>` stored in `instance`, if it holds one.
#[inline]
pub fn downcast<C>(instance: &Instance) -> Option<Arc<C>>
where
    C: ?Sized + Send + Sync + 'static,
{
    instance.downcast_ref::<Arc<C>>().cloned()
}
