//! Scoped service resolution and lifecycle management.
//!
//! This module contains the Scope type for managing request-scoped services
//! and their disposal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, debug_span, trace};

use crate::constructor::Constructed;
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::internal::{release_all, DisposeBag, ResolutionStack};
use crate::registration::CacheKey;
use crate::service_type::ServiceType;
use crate::traits::ResolverCore;

use super::{report, ServiceProvider};

/// Scoped service container for request-scoped dependency resolution.
///
/// A `Scope` provides isolated dependency resolution for scoped services while
/// still accessing singleton services from the root provider. This is ideal for
/// units of work such as a request: scoped services are shared within one
/// scope and isolated between scopes.
///
/// # Lifetime Behavior
///
/// - **Singleton**: Resolved and cached in the root provider (shared across all scopes)
/// - **Scoped**: Resolved and cached within this specific scope
/// - **Transient**: Created fresh on every resolution (no caching)
///
/// A scope is meant to be used from one unit of work at a time. Handles are
/// `Clone`; the scope is disposed by [`dispose`](Self::dispose) or when the
/// last handle drops.
///
/// # Examples
///
/// ```
/// use ferrous_container::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct DatabaseConnection(String);
///
/// struct UserService {
///     db: Arc<DatabaseConnection>,
/// }
///
/// let mut collection = ServiceCollection::new();
///
/// // Scoped database connection per request
/// collection.add_scoped_factory::<DatabaseConnection, _>(|_| {
///     Ok(Arc::new(DatabaseConnection("connection-123".to_string())))
/// });
///
/// // Transient user service that uses scoped DB connection
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     Ok(Arc::new(UserService {
///         db: resolver.get_required::<DatabaseConnection>()?,
///     }))
/// });
///
/// let provider = collection.build();
/// let scope = provider.create_scope();
///
/// let a = scope.get_required::<UserService>().unwrap();
/// let b = scope.get_required::<UserService>().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// assert!(Arc::ptr_eq(&a.db, &b.db));
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    root: ServiceProvider,
    state: Mutex<ScopeState>,
    disposed: AtomicBool,
}

#[derive(Default)]
struct ScopeState {
    instances: HashMap<CacheKey, Instance>,
    disposables: DisposeBag,
}

impl ScopeInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let (instances, entries) = {
            let mut state = self.state.lock();
            let instances = std::mem::take(&mut state.instances);
            (instances, state.disposables.take())
        };
        debug!(
            cached = instances.len(),
            disposables = entries.len(),
            "disposing scope"
        );
        release_all(entries, "scope");
        drop(instances);
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Scope {
    pub(crate) fn new(root: ServiceProvider) -> Self {
        trace!("scope created");
        Self {
            inner: Arc::new(ScopeInner {
                root,
                state: Mutex::new(ScopeState::default()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// The root provider this scope was created from.
    pub fn provider(&self) -> &ServiceProvider {
        &self.inner.root
    }

    /// Releases every disposable owned by the scope and clears its cache.
    ///
    /// Idempotent. A panic in one release is logged and the remaining ones
    /// still run. Later resolutions fail with [`DiError::Disposed`].
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_alive(&self) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::Disposed("scope"));
        }
        Ok(())
    }

    /// Returns the cached instance for `key`, constructing it on a miss.
    ///
    /// The cache lock is not held during construction. If a concurrent
    /// construction stored an instance first, that instance wins and the
    /// late one is still tracked for disposal.
    pub(crate) fn resolve_scoped<F>(&self, key: &CacheKey, construct: F) -> DiResult<Instance>
    where
        F: FnOnce() -> DiResult<Constructed>,
    {
        if let Some(instance) = self.inner.state.lock().instances.get(key) {
            trace!("scoped cache hit");
            return Ok(instance.clone());
        }

        let constructed = construct()?;

        let mut state = self.inner.state.lock();
        if self.is_disposed() {
            drop(state);
            release_all(constructed.disposers, "scope");
            return Err(DiError::Disposed("scope"));
        }
        state.disposables.extend(constructed.disposers);
        let instance = state
            .instances
            .entry(key.clone())
            .or_insert(constructed.instance)
            .clone();
        Ok(instance)
    }
}

impl ResolverCore for Scope {
    fn resolve(&self, service_type: &ServiceType) -> DiResult<Option<Instance>> {
        let span = debug_span!("resolve", service = %service_type, scoped = true);
        let _enter = span.enter();
        let stack = ResolutionStack::default();
        report(
            service_type,
            self.inner.root.enter_resolution().and_then(|_entry| {
                self.inner.root.resolve_in(Some(self), service_type, &stack)
            }),
        )
    }

    fn resolve_all(&self, service_type: &ServiceType) -> DiResult<Vec<Instance>> {
        let span = debug_span!("resolve_all", service = %service_type, scoped = true);
        let _enter = span.enter();
        let stack = ResolutionStack::default();
        report(
            service_type,
            self.inner.root.enter_resolution().and_then(|_entry| {
                self.inner.root.resolve_all_in(Some(self), service_type, &stack)
            }),
        )
    }
}
