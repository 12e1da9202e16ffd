//! Resolver context for dependency injection.
//!
//! This module contains the ResolverContext type which provides
//! the interface for factory functions to resolve dependencies.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::DiResult;
use crate::instance::Instance;
use crate::internal::ResolutionStack;
use crate::provider::{Scope, ServiceProvider};
use crate::service_type::ServiceType;
use crate::traits::{Dispose, ResolverCore};

/// Context passed to factory functions for resolving dependencies.
///
/// Resolutions made through the context continue the caller's resolution
/// chain, so a factory that (directly or not) asks for its own contract is
/// reported as a cycle instead of recursing.
///
/// # Examples
///
/// ```
/// use ferrous_container::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database {
///     url: "postgres://localhost".to_string()
/// });
/// services.add_transient_factory::<UserService, _>(|resolver| {
///     Ok(Arc::new(UserService {
///         db: resolver.get_required::<Database>()?,
///     }))
/// });
///
/// let provider = services.build();
/// let users = provider.get_required::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    provider: &'a ServiceProvider,
    scope: Option<&'a Scope>,
    stack: &'a ResolutionStack,
    disposers: Mutex<Vec<Arc<dyn Dispose>>>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(
        provider: &'a ServiceProvider,
        scope: Option<&'a Scope>,
        stack: &'a ResolutionStack,
    ) -> Self {
        Self {
            provider,
            scope,
            stack,
            disposers: Mutex::new(Vec::new()),
        }
    }

    /// The root provider.
    ///
    /// Resolving through it starts a new resolution chain. A singleton
    /// reached again that way on the same thread still fails with
    /// [`DiError::Circular`](crate::DiError::Circular).
    pub fn provider(&self) -> &ServiceProvider {
        self.provider
    }

    /// The scope the instance is being built for; `None` for singletons and
    /// root resolutions.
    pub fn scope(&self) -> Option<&Scope> {
        self.scope
    }

    /// Hands `service` to the cache that will own the instance being built.
    ///
    /// Singletons release it when the provider is disposed, scoped services
    /// when their scope is. Transient instances are not tracked.
    pub fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.disposers.lock().push(service);
    }

    pub(crate) fn into_disposers(self) -> Vec<Arc<dyn Dispose>> {
        self.disposers.into_inner()
    }
}

impl ResolverCore for ResolverContext<'_> {
    fn resolve(&self, service_type: &ServiceType) -> DiResult<Option<Instance>> {
        self.provider.resolve_in(self.scope, service_type, self.stack)
    }

    fn resolve_all(&self, service_type: &ServiceType) -> DiResult<Vec<Instance>> {
        self.provider.resolve_all_in(self.scope, service_type, self.stack)
    }
}
