//! Service collection module for dependency injection.
//!
//! This module contains the ServiceCollection type and related functionality
//! for registering services and building service providers.

use std::sync::Arc;

use crate::constructor::{Implements, Injectable, TypeDescriptor};
use crate::descriptors::ServiceDescriptor;
use crate::error::DiResult;
use crate::generic::GenericImplementation;
use crate::instance::into_instance;
use crate::lifetime::Lifetime;
use crate::options::ServiceProviderOptions;
use crate::provider::{ResolverContext, ServiceProvider};
use crate::registration::{Factory, Implementation, ImplementationType, Registration};
use crate::service_type::{GenericDefinition, ServiceType};

pub mod module_system;
pub use module_system::*;

/// Ordered set of registrations, mutable until built.
///
/// Insertion order matters: the last registration of a contract serves
/// single resolution and all of them, in order, serve collection requests.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> &'static str; }
/// struct Hello;
/// struct Hi;
/// impl Greeter for Hello { fn greet(&self) -> &'static str { "hello" } }
/// impl Greeter for Hi { fn greet(&self) -> &'static str { "hi" } }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_instance::<dyn Greeter>(Arc::new(Hello));
/// services.add_singleton_instance::<dyn Greeter>(Arc::new(Hi));
///
/// let provider = services.build();
/// assert_eq!(provider.get_required::<dyn Greeter>().unwrap().greet(), "hi");
/// assert_eq!(provider.get_all::<dyn Greeter>().unwrap().len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct ServiceCollection {
    registrations: Vec<Registration>,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self::default()
    }

    // ----- Raw Registrations -----

    /// Appends a registration.
    pub fn add(&mut self, registration: Registration) -> &mut Self {
        self.registrations.push(registration);
        self
    }

    /// Appends `registration` only when its contract has no registration yet.
    ///
    /// Returns whether it was added.
    pub fn try_add(&mut self, registration: Registration) -> bool {
        if self.contains_service(registration.contract()) {
            return false;
        }
        self.registrations.push(registration);
        true
    }

    // ----- Instance Registrations -----

    /// Registers a singleton instance that will be shared across the entire application.
    ///
    /// The value is wrapped in an `Arc`; every request returns that same
    /// `Arc`. Instances supplied by the caller are never disposed by the
    /// container.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_container::{ServiceCollection, Resolver};
    /// struct Config {
    ///     database_url: String
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Config {
    ///     database_url: "postgres://localhost".to_string()
    /// });
    /// let provider = services.build();
    /// assert!(provider.get_required::<Config>().unwrap().database_url.starts_with("postgres"));
    /// ```
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.add_singleton_instance::<T>(Arc::new(value))
    }

    /// Registers a shared value for the contract `C`, which may be a trait
    /// object.
    pub fn add_singleton_instance<C>(&mut self, value: Arc<C>) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.add(Registration::unchecked(
            ServiceType::of::<C>(),
            Implementation::Instance(into_instance(value)),
            Lifetime::Singleton,
        ))
    }

    /// Registers a pre-built value under an explicit lifetime.
    ///
    /// The same value is returned from every resolution; a scoped
    /// registration only restricts where it may be requested from. A
    /// transient lifetime is rejected with
    /// [`DiError::InvalidRegistration`](crate::DiError::InvalidRegistration)
    /// since a shared value can never be fresh.
    pub fn add_instance<C>(&mut self, lifetime: Lifetime, value: Arc<C>) -> DiResult<&mut Self>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let registration = Registration::new(
            ServiceType::of::<C>(),
            Implementation::Instance(into_instance(value)),
            lifetime,
        )?;
        Ok(self.add(registration))
    }

    // ----- Factory Registrations -----

    /// Registers a singleton factory that creates the instance on first request.
    ///
    /// The factory is called at most once; its dependencies resolve from the
    /// root provider.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_container::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// struct Pool { size: usize }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(8usize);
    /// services.add_singleton_factory::<Pool, _>(|r| {
    ///     Ok(Arc::new(Pool { size: *r.get_required::<usize>()? }))
    /// });
    ///
    /// let provider = services.build();
    /// let a = provider.get_required::<Pool>().unwrap();
    /// let b = provider.get_required::<Pool>().unwrap();
    /// assert!(Arc::ptr_eq(&a, &b));
    /// assert_eq!(a.size, 8);
    /// ```
    pub fn add_singleton_factory<C, F>(&mut self, factory: F) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<Arc<C>> + Send + Sync + 'static,
    {
        self.add_factory::<C, F>(Lifetime::Singleton, factory)
    }

    /// Registers a factory whose instance is cached per scope.
    pub fn add_scoped_factory<C, F>(&mut self, factory: F) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<Arc<C>> + Send + Sync + 'static,
    {
        self.add_factory::<C, F>(Lifetime::Scoped, factory)
    }

    /// Registers a factory invoked on every request.
    pub fn add_transient_factory<C, F>(&mut self, factory: F) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<Arc<C>> + Send + Sync + 'static,
    {
        self.add_factory::<C, F>(Lifetime::Transient, factory)
    }

    /// Registers a factory for the contract `C` under `lifetime`.
    pub fn add_factory<C, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> DiResult<Arc<C>> + Send + Sync + 'static,
    {
        let erased: Factory = Arc::new(move |context: &ResolverContext<'_>| {
            factory(context).map(into_instance)
        });
        self.add(Registration::unchecked(
            ServiceType::of::<C>(),
            Implementation::Factory(erased),
            lifetime,
        ))
    }

    // ----- Implementation Type Registrations -----

    /// Registers the constructible type `I` as the singleton for `C`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_container::{Constructor, Implements, Injectable, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// trait Clock: Send + Sync { fn now(&self) -> u64; }
    ///
    /// struct FixedClock;
    /// impl Clock for FixedClock { fn now(&self) -> u64 { 42 } }
    /// impl Implements<dyn Clock> for FixedClock {
    ///     fn upcast(self: Arc<Self>) -> Arc<dyn Clock> { self }
    /// }
    /// impl Injectable for FixedClock {
    ///     fn constructors() -> Vec<Constructor> {
    ///         vec![Constructor::new(Vec::new(), |_| Ok(FixedClock))]
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_type::<dyn Clock, FixedClock>();
    /// let provider = services.build();
    /// assert_eq!(provider.get_required::<dyn Clock>().unwrap().now(), 42);
    /// ```
    pub fn add_singleton_type<C, I>(&mut self) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable + Implements<C>,
    {
        self.add_type::<C, I>(Lifetime::Singleton)
    }

    pub fn add_scoped_type<C, I>(&mut self) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable + Implements<C>,
    {
        self.add_type::<C, I>(Lifetime::Scoped)
    }

    pub fn add_transient_type<C, I>(&mut self) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable + Implements<C>,
    {
        self.add_type::<C, I>(Lifetime::Transient)
    }

    /// Registers `I` as serving the contract `C` under `lifetime`.
    pub fn add_type<C, I>(&mut self, lifetime: Lifetime) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable + Implements<C>,
    {
        let descriptor = TypeDescriptor::of::<I>().implements_type::<I, C>();
        self.add(Registration::unchecked(
            ServiceType::of::<C>(),
            Implementation::Type(ImplementationType::Concrete(descriptor)),
            lifetime,
        ))
    }

    pub fn add_singleton_self<I: Injectable>(&mut self) -> &mut Self {
        self.add_type::<I, I>(Lifetime::Singleton)
    }

    pub fn add_scoped_self<I: Injectable>(&mut self) -> &mut Self {
        self.add_type::<I, I>(Lifetime::Scoped)
    }

    pub fn add_transient_self<I: Injectable>(&mut self) -> &mut Self {
        self.add_type::<I, I>(Lifetime::Transient)
    }

    /// Registers an open generic implementation for the unbound contract
    /// `definition`.
    ///
    /// Fails with [`DiError::InvalidRegistration`](crate::DiError::InvalidRegistration)
    /// when the arities differ.
    pub fn add_open_generic(
        &mut self,
        definition: GenericDefinition,
        implementation: GenericImplementation,
        lifetime: Lifetime,
    ) -> DiResult<&mut Self> {
        let registration = Registration::builder(definition.as_service_type(), lifetime)
            .open_generic(implementation)
            .build()?;
        Ok(self.add(registration))
    }

    // ----- Service Descriptors and Introspection -----

    /// True when `T` has at least one registration.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.contains_service(&ServiceType::of::<T>())
    }

    pub fn contains_service(&self, contract: &ServiceType) -> bool {
        self.registrations
            .iter()
            .any(|registration| registration.contract() == contract)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registrations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.iter()
    }

    /// Snapshot of every registration for diagnostics.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.registrations.iter().map(ServiceDescriptor::from).collect()
    }

    // ----- Build -----

    /// Builds the provider with default options.
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::new(self.registrations, ServiceProviderOptions::default())
    }

    /// Builds the provider; with `validate_on_build` every registration is
    /// activated once and the first failure is returned as
    /// [`DiError::Validation`](crate::DiError::Validation).
    ///
    /// ```rust
    /// use ferrous_container::{DiError, Resolver, ServiceCollection, ServiceProviderOptions};
    /// use std::sync::Arc;
    ///
    /// struct Missing;
    /// struct Needy;
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_factory::<Needy, _>(|r| {
    ///     r.get_required::<Missing>()?;
    ///     Ok(Arc::new(Needy))
    /// });
    ///
    /// let options = ServiceProviderOptions::new().with_validate_on_build(true);
    /// assert!(matches!(
    ///     services.build_with_options(options),
    ///     Err(DiError::Validation { .. })
    /// ));
    /// ```
    pub fn build_with_options(self, options: ServiceProviderOptions) -> DiResult<ServiceProvider> {
        let provider = ServiceProvider::new(self.registrations, options);
        if options.validate_on_build {
            if let Err(err) = provider.validate() {
                provider.dispose();
                return Err(err);
            }
        }
        Ok(provider)
    }
}

impl Extend<Registration> for ServiceCollection {
    fn extend<I: IntoIterator<Item = Registration>>(&mut self, iter: I) {
        self.registrations.extend(iter);
    }
}

impl FromIterator<Registration> for ServiceCollection {
    fn from_iter<I: IntoIterator<Item = Registration>>(iter: I) -> Self {
        Self {
            registrations: iter.into_iter().collect(),
        }
    }
}
