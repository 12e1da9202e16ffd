//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (flushing
/// caches, closing connections). The container calls [`Dispose::dispose`]
/// once per instance it owns: scoped instances when their
/// [`Scope`](crate::Scope) is disposed, singletons when the
/// [`ServiceProvider`](crate::ServiceProvider) is disposed. A panic inside
/// `dispose` is caught and logged so the remaining instances still get
/// released.
///
/// # Examples
///
/// ```
/// use ferrous_container::{Constructor, Dispose, Injectable, ServiceCollection, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// impl Injectable for Cache {
///     fn constructors() -> Vec<Constructor> {
///         vec![Constructor::disposable(Vec::new(), |_| Ok(Cache::default()))]
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_self::<Cache>();
///
/// let provider = services.build();
/// let scope = provider.create_scope();
/// let cache = scope.get_required::<Cache>().unwrap();
/// scope.dispose();
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
