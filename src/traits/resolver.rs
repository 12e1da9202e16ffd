//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::instance::{downcast, Instance};
use crate::service_type::ServiceType;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`ServiceProvider`](crate::ServiceProvider),
/// [`Scope`](crate::Scope) and the [`ResolverContext`](crate::ResolverContext)
/// handed to factories. Works on runtime [`ServiceType`] handles and
/// type-erased [`Instance`] values; the generic helpers live on [`Resolver`].
///
/// `dyn ResolverCore` is itself resolvable: requesting it yields the calling
/// resolver.
pub trait ResolverCore: Send + Sync {
    /// Resolves a single service.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(instance))` - the last registration for the type, activated under its lifetime
    /// * `Ok(None)` - nothing satisfies the type
    /// * `Err(DiError)` - wiring defect (cycle, unresolvable constructor, scope misuse, ...)
    fn resolve(&self, service_type: &ServiceType) -> DiResult<Option<Instance>>;

    /// Resolves every registration of `service_type` in registration order.
    ///
    /// Each element honors its own lifetime. An unregistered type yields an
    /// empty vector.
    fn resolve_all(&self, service_type: &ServiceType) -> DiResult<Vec<Instance>>;

    /// Like [`resolve`](Self::resolve) but a missing service is
    /// [`DiError::NotFound`].
    fn resolve_required(&self, service_type: &ServiceType) -> DiResult<Instance> {
        self.resolve(service_type)?
            .ok_or_else(|| DiError::NotFound(service_type.clone()))
    }
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// Blanket-implemented for every [`ResolverCore`]. `T` may be unsized, so
/// trait objects resolve exactly like concrete types:
///
/// ```
/// use ferrous_container::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String { format!("LOG: {}", msg) }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(42usize);
/// services.add_singleton_instance::<dyn Logger>(Arc::new(ConsoleLogger));
///
/// let provider = services.build();
/// assert_eq!(*provider.get_required::<usize>().unwrap(), 42);
/// let logger = provider.get_required::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("hi"), "LOG: hi");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `T`, or `None` when it is not registered.
    fn get<T>(&self) -> DiResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_service::<T>(&ServiceType::of::<T>())
    }

    /// Resolves `T`, failing with [`DiError::NotFound`] when it is not registered.
    fn get_required<T>(&self) -> DiResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_required_service::<T>(&ServiceType::of::<T>())
    }

    /// Resolves every registration of `T` in registration order.
    fn get_all<T>(&self) -> DiResult<Vec<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let service_type = ServiceType::of::<T>();
        self.resolve_all(&service_type)?
            .iter()
            .map(|instance| {
                downcast::<T>(instance).ok_or_else(|| DiError::TypeMismatch(service_type.clone()))
            })
            .collect()
    }

    /// Resolves `service_type` and downcasts the result to `Arc<T>`.
    ///
    /// This is how closed generic contracts such as `Handler<Order>` are
    /// requested: the runtime handle names the contract, `T` names the Rust
    /// type the implementation was stored as.
    fn get_service<T>(&self, service_type: &ServiceType) -> DiResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.resolve(service_type)? {
            Some(instance) => downcast::<T>(&instance)
                .map(Some)
                .ok_or_else(|| DiError::TypeMismatch(service_type.clone())),
            None => Ok(None),
        }
    }

    /// Required variant of [`get_service`](Self::get_service).
    fn get_required_service<T>(&self, service_type: &ServiceType) -> DiResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_service::<T>(service_type)?
            .ok_or_else(|| DiError::NotFound(service_type.clone()))
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
