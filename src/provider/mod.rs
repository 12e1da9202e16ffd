//! Service provider module for dependency injection.
//!
//! This module contains the ServiceProvider type, the resolution engine
//! behind it, and the scope and context types it hands out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tracing::{debug, debug_span, error, trace, warn};

use crate::constructor::Constructed;
use crate::error::{DiError, DiResult};
use crate::instance::{into_instance, Instance};
use crate::internal::{release_all, DisposeBag, EntryGuard, NestedEntries, ResolutionStack};
use crate::lifetime::Lifetime;
use crate::options::ServiceProviderOptions;
use crate::registration::{
    CacheKey, Implementation, ImplementationType, Registration, Registry,
};
use crate::service_type::ServiceType;
use crate::traits::ResolverCore;

mod activator;
pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

/// Singleton cache entry. `builder` names the thread constructing the
/// value while `value` is locked for construction.
#[derive(Default)]
struct SingletonSlot {
    value: Mutex<Option<Instance>>,
    builder: Mutex<Option<ThreadId>>,
}

type Slot = Arc<SingletonSlot>;

/// Clears the slot's builder on every exit path, unwinding included.
struct BuildingMark<'a> {
    slot: &'a SingletonSlot,
}

impl<'a> BuildingMark<'a> {
    fn new(slot: &'a SingletonSlot, builder: ThreadId) -> Self {
        *slot.builder.lock() = Some(builder);
        Self { slot }
    }
}

impl Drop for BuildingMark<'_> {
    fn drop(&mut self) {
        *self.slot.builder.lock() = None;
    }
}

/// Service provider for resolving dependencies from the DI container.
///
/// The ServiceProvider is the root resolver built from a
/// [`ServiceCollection`](crate::ServiceCollection). It owns the singleton
/// cache and the cache of closed generic registrations, and creates
/// [`Scope`]s for Scoped services. Handles are cheap to clone and share the
/// same caches.
///
/// # Thread Safety
///
/// ServiceProvider is `Send + Sync`. A singleton is constructed at most once
/// per registration even when first requested from several threads at the
/// same time.
///
/// # Examples
///
/// ```
/// use ferrous_container::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Config { port: 8080 });
///
/// let provider = services.build();
/// let config = provider.get_required::<Config>().unwrap();
/// assert_eq!(config.port, 8080);
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    registry: Registry,
    options: ServiceProviderOptions,
    singletons: Mutex<HashMap<CacheKey, Slot>>,
    closed_generics: Mutex<HashMap<ServiceType, Arc<Registration>>>,
    root_disposers: Mutex<DisposeBag>,
    nested: NestedEntries,
    disposed: AtomicBool,
}

impl ProviderInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let entries = self.root_disposers.lock().take();
        self.singletons.lock().clear();
        self.closed_generics.lock().clear();
        debug!(disposables = entries.len(), "disposing service provider");
        release_all(entries, "service provider");
    }
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl ServiceProvider {
    pub(crate) fn new(registrations: Vec<Registration>, options: ServiceProviderOptions) -> Self {
        let registry = Registry::compile(registrations);
        debug!(registrations = registry.len(), ?options, "built service provider");
        Self {
            inner: Arc::new(ProviderInner {
                registry,
                options,
                singletons: Mutex::new(HashMap::new()),
                closed_generics: Mutex::new(HashMap::new()),
                root_disposers: Mutex::new(DisposeBag::default()),
                nested: NestedEntries::default(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Options the provider was built with.
    pub fn options(&self) -> &ServiceProviderOptions {
        &self.inner.options
    }

    /// Creates a new scope for Scoped services.
    ///
    /// ```
    /// use ferrous_container::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    ///
    /// struct RequestId(u32);
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_scoped_factory::<RequestId, _>(|_| Ok(Arc::new(RequestId(1))));
    ///
    /// let provider = services.build();
    /// let scope = provider.create_scope();
    /// assert_eq!(scope.get_required::<RequestId>().unwrap().0, 1);
    /// ```
    ///
    /// A scope created after [`dispose`](Self::dispose) fails every
    /// resolution with [`DiError::Disposed`]; use
    /// [`try_create_scope`](Self::try_create_scope) to fail up front.
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// Like [`create_scope`](Self::create_scope), but returns
    /// [`DiError::Disposed`] when the provider is already disposed.
    pub fn try_create_scope(&self) -> DiResult<Scope> {
        self.ensure_alive()?;
        Ok(self.create_scope())
    }

    /// True when `service_type` is registered, closable from an open generic
    /// registration, or a built-in served at the root.
    pub fn is_service(&self, service_type: &ServiceType) -> bool {
        self.can_resolve(None, service_type)
    }

    /// Implementation type that would serve `service_type`, when known.
    ///
    /// Factories and instances have no statically known implementation type.
    pub fn implementation_type(&self, service_type: &ServiceType) -> Option<ServiceType> {
        self.lookup(service_type)
            .and_then(|(_, registration)| registration.implementation_type())
    }

    /// Releases every disposable singleton, newest first.
    ///
    /// Idempotent. Afterwards every resolution through the provider or its
    /// scopes fails with [`DiError::Disposed`]. Dropping the last handle
    /// disposes as well.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_alive(&self) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::Disposed("service provider"));
        }
        Ok(())
    }

    /// Marks the start of a public resolve call on the current thread.
    pub(crate) fn enter_resolution(&self) -> DiResult<EntryGuard<'_>> {
        self.inner.nested.enter()
    }

    /// Activates every registration once; scoped ones inside a throwaway
    /// scope.
    pub(crate) fn validate(&self) -> DiResult<()> {
        for (index, registration) in self.inner.registry.iter() {
            if registration.is_open_generic() {
                continue;
            }
            let key = CacheKey::Registration(index);
            let stack = ResolutionStack::default();
            let result = match registration.lifetime() {
                Lifetime::Singleton => self.activate(None, &key, registration, &stack),
                Lifetime::Scoped | Lifetime::Transient => {
                    let scope = self.create_scope();
                    let result = self.activate(Some(&scope), &key, registration, &stack);
                    scope.dispose();
                    result
                }
            };
            if let Err(source) = result {
                return Err(DiError::Validation {
                    service: registration.contract().clone(),
                    source: Box::new(source),
                });
            }
            trace!(service = %registration.contract(), "validated registration");
        }
        debug!(registrations = self.inner.registry.len(), "service provider validated");
        Ok(())
    }

    // ----- Resolution engine -----

    pub(crate) fn resolve_in(
        &self,
        scope: Option<&Scope>,
        service_type: &ServiceType,
        stack: &ResolutionStack,
    ) -> DiResult<Option<Instance>> {
        self.ensure_alive()?;
        if let Some(scope) = scope {
            scope.ensure_alive()?;
        }

        if let Some(instance) = self.builtin(scope, service_type) {
            return Ok(Some(instance));
        }

        match self.lookup(service_type) {
            Some((key, registration)) => self
                .activate(scope, &key, &registration, stack)
                .map(Some),
            None => {
                trace!(service = %service_type, "no registration");
                Ok(None)
            }
        }
    }

    pub(crate) fn resolve_all_in(
        &self,
        scope: Option<&Scope>,
        service_type: &ServiceType,
        stack: &ResolutionStack,
    ) -> DiResult<Vec<Instance>> {
        self.ensure_alive()?;
        if let Some(scope) = scope {
            scope.ensure_alive()?;
        }

        self.inner
            .registry
            .all(service_type)
            .filter(|(_, registration)| !registration.is_open_generic())
            .map(|(index, registration)| {
                self.activate(scope, &CacheKey::Registration(index), registration, stack)
            })
            .collect()
    }

    fn builtin(&self, scope: Option<&Scope>, service_type: &ServiceType) -> Option<Instance> {
        if *service_type == ServiceType::of::<ServiceProvider>() {
            return Some(into_instance(Arc::new(self.clone())));
        }
        if *service_type == ServiceType::of::<Scope>() {
            return scope.map(|scope| into_instance(Arc::new(scope.clone())));
        }
        if *service_type == ServiceType::of::<dyn ResolverCore>() {
            let resolver: Arc<dyn ResolverCore> = match scope {
                Some(scope) => Arc::new(scope.clone()),
                None => Arc::new(self.clone()),
            };
            return Some(into_instance(resolver));
        }
        None
    }

    pub(crate) fn can_resolve(&self, scope: Option<&Scope>, service_type: &ServiceType) -> bool {
        let builtin = *service_type == ServiceType::of::<ServiceProvider>()
            || *service_type == ServiceType::of::<dyn ResolverCore>()
            || (scope.is_some() && *service_type == ServiceType::of::<Scope>());
        builtin || self.lookup(service_type).is_some()
    }

    /// Finds the registration serving `service_type`: the last exact
    /// registration, else one closed from an open generic registration.
    fn lookup(&self, service_type: &ServiceType) -> Option<(CacheKey, Arc<Registration>)> {
        if service_type.is_generic_definition() {
            return None;
        }
        if let Some((index, registration)) = self.inner.registry.last(service_type) {
            return Some((CacheKey::Registration(index), registration.clone()));
        }
        if service_type.is_closed_generic() {
            return self
                .close_open_generic(service_type)
                .map(|registration| (CacheKey::Closed(service_type.clone()), registration));
        }
        None
    }

    fn close_open_generic(&self, contract: &ServiceType) -> Option<Arc<Registration>> {
        let (definition, _) = contract.closed_parts()?;

        let mut closed = self.inner.closed_generics.lock();
        if let Some(registration) = closed.get(contract) {
            return Some(registration.clone());
        }

        let (_, open) = self.inner.registry.last(&definition.as_service_type())?;
        let Implementation::Type(ImplementationType::Generic(implementation)) = open.implementation()
        else {
            return None;
        };
        let descriptor = implementation.close(contract)?;
        debug!(
            %contract,
            implementation = %descriptor.service_type(),
            lifetime = %open.lifetime(),
            "closed open generic registration"
        );

        let registration = Arc::new(Registration::unchecked(
            contract.clone(),
            Implementation::Type(ImplementationType::Concrete(descriptor)),
            open.lifetime(),
        ));
        closed.insert(contract.clone(), registration.clone());
        Some(registration)
    }

    /// Produces an instance of `registration` under its lifetime.
    fn activate(
        &self,
        scope: Option<&Scope>,
        key: &CacheKey,
        registration: &Registration,
        stack: &ResolutionStack,
    ) -> DiResult<Instance> {
        let _frame = match registration.implementation() {
            Implementation::Instance(_) => None,
            _ => Some(stack.enter(
                registration.contract(),
                registration.implementation_type().as_ref(),
            )?),
        };

        match registration.lifetime() {
            Lifetime::Singleton => self.activate_singleton(key, registration, stack),
            Lifetime::Scoped => match scope {
                Some(scope) => scope.resolve_scoped(key, || {
                    self.construct(Some(scope), registration, stack)
                }),
                None if self.inner.options.validate_scopes => {
                    Err(DiError::ScopedWithoutScope(registration.contract().clone()))
                }
                None => {
                    warn!(
                        service = %registration.contract(),
                        "scoped service resolved without a scope; instance is not cached \
                         and its disposers are not tracked"
                    );
                    self.construct(None, registration, stack)
                        .map(|constructed| untracked(registration, constructed))
                }
            },
            Lifetime::Transient => {
                trace!(service = %registration.contract(), "constructing transient");
                self.construct(scope, registration, stack)
                    .map(|constructed| untracked(registration, constructed))
            }
        }
    }

    fn activate_singleton(
        &self,
        key: &CacheKey,
        registration: &Registration,
        stack: &ResolutionStack,
    ) -> DiResult<Instance> {
        let slot = self
            .inner
            .singletons
            .lock()
            .entry(key.clone())
            .or_default()
            .clone();

        let current = thread::current().id();
        if *slot.builder.lock() == Some(current) {
            // re-entered through a resolver that started a new chain
            return Err(stack.cycle_through(registration.contract()));
        }

        let mut cached = slot.value.lock();
        if let Some(instance) = cached.as_ref() {
            trace!(service = %registration.contract(), "singleton cache hit");
            return Ok(instance.clone());
        }

        let constructed = {
            let _building = BuildingMark::new(&slot, current);
            // dependencies of a singleton always come from the root
            self.construct(None, registration, stack)?
        };

        // checked under the bag lock so a concurrent dispose either sees
        // these disposers or has already taken the bag
        let mut root_disposers = self.inner.root_disposers.lock();
        if self.is_disposed() {
            drop(root_disposers);
            drop(cached);
            release_all(constructed.disposers, "service provider");
            return Err(DiError::Disposed("service provider"));
        }
        root_disposers.extend(constructed.disposers);
        drop(root_disposers);

        debug!(service = %registration.contract(), "constructed singleton");
        *cached = Some(constructed.instance.clone());
        Ok(constructed.instance)
    }

    fn construct(
        &self,
        scope: Option<&Scope>,
        registration: &Registration,
        stack: &ResolutionStack,
    ) -> DiResult<Constructed> {
        match registration.implementation() {
            Implementation::Instance(instance) => Ok(Constructed::shared(instance.clone())),
            Implementation::Factory(factory) => {
                let context = ResolverContext::new(self, scope, stack);
                let instance = factory(&context)?;
                Ok(Constructed {
                    instance,
                    disposers: context.into_disposers(),
                })
            }
            Implementation::Type(ImplementationType::Concrete(descriptor)) => {
                activator::activate(self, scope, stack, registration.contract(), descriptor)
            }
            Implementation::Type(ImplementationType::Generic(open)) => {
                Err(DiError::InvalidRegistration {
                    contract: registration.contract().clone(),
                    reason: format!(
                        "open implementation {} can only serve closed contracts",
                        open.definition()
                    ),
                })
            }
        }
    }
}

/// Logs failures at the public entry points.
/// Drops the disposers of an instance no cache owns; the caller releases it.
fn untracked(registration: &Registration, constructed: Constructed) -> Instance {
    if !constructed.disposers.is_empty() {
        debug!(
            service = %registration.contract(),
            disposers = constructed.disposers.len(),
            "disposers of an uncached instance are not tracked"
        );
    }
    constructed.instance
}

pub(crate) fn report<T>(service_type: &ServiceType, result: DiResult<T>) -> DiResult<T> {
    if let Err(err) = &result {
        error!(service = %service_type, error = %err, "service resolution failed");
    }
    result
}

impl ResolverCore for ServiceProvider {
    fn resolve(&self, service_type: &ServiceType) -> DiResult<Option<Instance>> {
        let span = debug_span!("resolve", service = %service_type);
        let _enter = span.enter();
        let stack = ResolutionStack::default();
        report(
            service_type,
            self.enter_resolution()
                .and_then(|_entry| self.resolve_in(None, service_type, &stack)),
        )
    }

    fn resolve_all(&self, service_type: &ServiceType) -> DiResult<Vec<Instance>> {
        let span = debug_span!("resolve_all", service = %service_type);
        let _enter = span.enter();
        let stack = ResolutionStack::default();
        report(
            service_type,
            self.enter_resolution()
                .and_then(|_entry| self.resolve_all_in(None, service_type, &stack)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Resolver;
    use crate::ServiceCollection;
    use tracing_test::traced_test;

    struct Session;

    #[traced_test]
    #[test]
    fn unvalidated_root_scoped_resolution_warns_and_skips_the_cache() {
        let mut services = ServiceCollection::new();
        services.add_scoped_factory::<Session, _>(|_| Ok(Arc::new(Session)));
        let provider = services
            .build_with_options(ServiceProviderOptions::new().with_validate_scopes(false))
            .unwrap();

        let first = provider.get_required::<Session>().unwrap();
        let second = provider.get_required::<Session>().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(logs_contain("scoped service resolved without a scope"));
    }

    #[traced_test]
    #[test]
    fn failed_resolution_is_logged() {
        let mut services = ServiceCollection::new();
        services.add_scoped_factory::<Session, _>(|_| Ok(Arc::new(Session)));
        let provider = services.build();

        assert!(matches!(
            provider.get::<Session>(),
            Err(DiError::ScopedWithoutScope(_))
        ));
        assert!(logs_contain("service resolution failed"));
    }

    #[traced_test]
    #[test]
    fn closing_an_open_generic_is_logged_once() {
        use crate::{Constructor, GenericDefinition, GenericImplementation, TypeDescriptor};

        struct BoxFamily;
        struct HeapBoxFamily;
        struct Payload;

        let boxed = GenericDefinition::new::<BoxFamily>("Box", 1);
        let heap = GenericDefinition::new::<HeapBoxFamily>("HeapBox", 1);

        let mut services = ServiceCollection::new();
        services
            .add_open_generic(
                boxed,
                GenericImplementation::new(heap, move |args| {
                    Some(
                        TypeDescriptor::new(heap.close(args.iter().cloned()))
                            .with_constructor(Constructor::new(Vec::new(), |_| Ok(7u8)))
                            .implements::<u8, u8, _>(boxed.close(args.iter().cloned()), |v| v),
                    )
                }),
                Lifetime::Transient,
            )
            .unwrap();
        let provider = services.build();
        let contract = boxed.close([ServiceType::of::<Payload>()]);

        assert_eq!(*provider.get_required_service::<u8>(&contract).unwrap(), 7);
        assert_eq!(*provider.get_required_service::<u8>(&contract).unwrap(), 7);
        assert!(logs_contain("closed open generic registration"));
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("closed open generic registration"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one closing, saw {}", n)),
            }
        });
    }

    #[traced_test]
    #[test]
    fn transient_disposers_are_reported_as_untracked() {
        use crate::traits::Dispose;

        struct Handle;
        impl Dispose for Handle {
            fn dispose(&self) {}
        }

        let mut services = ServiceCollection::new();
        services.add_transient_factory::<Handle, _>(|r| {
            let handle = Arc::new(Handle);
            r.register_disposer(handle.clone());
            Ok(handle)
        });
        let provider = services.build();

        provider.get_required::<Handle>().unwrap();
        assert!(logs_contain("disposers of an uncached instance are not tracked"));
    }
}
