//! Service registration types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constructor::TypeDescriptor;
use crate::descriptors::ImplementationKind;
use crate::error::{DiError, DiResult};
use crate::generic::GenericImplementation;
use crate::instance::Instance;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::service_type::ServiceType;

/// Type-erased factory; the returned instance must hold an `Arc<C>` for the
/// registration's contract `C`.
pub type Factory = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<Instance> + Send + Sync>;

/// A type the container constructs itself.
#[derive(Clone, Debug)]
pub enum ImplementationType {
    /// A concrete type with constructor descriptors.
    Concrete(TypeDescriptor),
    /// An open generic type, closed per requested contract.
    Generic(GenericImplementation),
}

/// What satisfies a contract. Exactly one per registration.
#[derive(Clone)]
pub enum Implementation {
    Type(ImplementationType),
    /// A pre-built value, owned by the caller.
    Instance(Instance),
    Factory(Factory),
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Type(ty) => f.debug_tuple("Type").field(ty).finish(),
            Implementation::Instance(_) => f.write_str("Instance(..)"),
            Implementation::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// One contract → implementation binding under a lifetime.
///
/// Registrations are immutable once built. Several may share a contract: the
/// last one serves single resolution, all of them serve collection requests.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{DiError, Lifetime, Registration, ServiceType};
/// use ferrous_container::instance::into_instance;
/// use std::sync::Arc;
///
/// let registration = Registration::builder(ServiceType::of::<u32>(), Lifetime::Singleton)
///     .instance(into_instance(Arc::new(7u32)))
///     .build()
///     .unwrap();
/// assert_eq!(registration.lifetime(), Lifetime::Singleton);
///
/// let empty = Registration::builder(ServiceType::of::<u32>(), Lifetime::Singleton).build();
/// assert!(matches!(empty, Err(DiError::InvalidRegistration { .. })));
/// ```
#[derive(Clone, Debug)]
pub struct Registration {
    contract: ServiceType,
    implementation: Implementation,
    lifetime: Lifetime,
}

impl Registration {
    /// Validated registration.
    ///
    /// Fails with [`DiError::InvalidRegistration`] when an open generic
    /// contract is paired with anything but an open implementation of the
    /// same arity (or the reverse), a concrete type does not declare
    /// itself assignable to the contract, or a pre-built instance is given
    /// a transient lifetime.
    pub fn new(
        contract: ServiceType,
        implementation: Implementation,
        lifetime: Lifetime,
    ) -> DiResult<Self> {
        let invalid = |reason: String| DiError::InvalidRegistration {
            contract: contract.clone(),
            reason,
        };

        match &implementation {
            Implementation::Type(ImplementationType::Generic(open)) => {
                let Some(definition) = contract
                    .generic_definition()
                    .filter(|_| contract.is_generic_definition())
                else {
                    return Err(invalid(format!(
                        "open implementation {} requires an unbound generic contract",
                        open.definition()
                    )));
                };
                if definition.arity() != open.definition().arity() {
                    return Err(invalid(format!(
                        "open implementation {} has arity {}, contract has arity {}",
                        open.definition(),
                        open.definition().arity(),
                        definition.arity()
                    )));
                }
            }
            _ if contract.is_generic_definition() => {
                return Err(invalid(
                    "unbound generic contracts can only be served by an open implementation type"
                        .to_string(),
                ));
            }
            Implementation::Type(ImplementationType::Concrete(descriptor)) => {
                if !descriptor.is_assignable_to(&contract) {
                    return Err(invalid(format!(
                        "{} is not assignable to the contract",
                        descriptor.service_type()
                    )));
                }
            }
            Implementation::Instance(_) if lifetime == Lifetime::Transient => {
                return Err(invalid(
                    "a pre-built instance can not be registered as transient".to_string(),
                ));
            }
            Implementation::Instance(_) | Implementation::Factory(_) => {}
        }

        Ok(Self::unchecked(contract, implementation, lifetime))
    }

    /// Starts a registration for `contract`; see [`RegistrationBuilder`].
    pub fn builder(contract: ServiceType, lifetime: Lifetime) -> RegistrationBuilder {
        RegistrationBuilder {
            contract,
            lifetime,
            implementations: Vec::new(),
        }
    }

    /// Registration whose pairing is correct by construction (typed helpers,
    /// closed generics).
    pub(crate) fn unchecked(
        contract: ServiceType,
        implementation: Implementation,
        lifetime: Lifetime,
    ) -> Self {
        Self {
            contract,
            implementation,
            lifetime,
        }
    }

    pub fn contract(&self) -> &ServiceType {
        &self.contract
    }

    pub fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Implementation type when it is known statically: the concrete type or
    /// the unbound generic definition.
    pub fn implementation_type(&self) -> Option<ServiceType> {
        match &self.implementation {
            Implementation::Type(ImplementationType::Concrete(descriptor)) => {
                Some(descriptor.service_type().clone())
            }
            Implementation::Type(ImplementationType::Generic(open)) => {
                Some(open.definition().as_service_type())
            }
            Implementation::Instance(_) | Implementation::Factory(_) => None,
        }
    }

    pub fn kind(&self) -> ImplementationKind {
        match &self.implementation {
            Implementation::Type(_) => ImplementationKind::Type,
            Implementation::Instance(_) => ImplementationKind::Instance,
            Implementation::Factory(_) => ImplementationKind::Factory,
        }
    }

    pub fn is_open_generic(&self) -> bool {
        matches!(
            self.implementation,
            Implementation::Type(ImplementationType::Generic(_))
        )
    }
}

/// Collects the implementation of a registration.
///
/// Exactly one implementation must be supplied; [`build`](Self::build)
/// rejects zero or several.
#[must_use]
pub struct RegistrationBuilder {
    contract: ServiceType,
    lifetime: Lifetime,
    implementations: Vec<Implementation>,
}

impl RegistrationBuilder {
    /// Concrete implementation type.
    pub fn implementation_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.implementations
            .push(Implementation::Type(ImplementationType::Concrete(descriptor)));
        self
    }

    /// Open generic implementation type.
    pub fn open_generic(mut self, implementation: GenericImplementation) -> Self {
        self.implementations
            .push(Implementation::Type(ImplementationType::Generic(implementation)));
        self
    }

    pub fn instance(mut self, instance: Instance) -> Self {
        self.implementations.push(Implementation::Instance(instance));
        self
    }

    pub fn factory(mut self, factory: Factory) -> Self {
        self.implementations.push(Implementation::Factory(factory));
        self
    }

    pub fn build(mut self) -> DiResult<Registration> {
        match self.implementations.len() {
            1 => {}
            0 => {
                return Err(DiError::InvalidRegistration {
                    contract: self.contract,
                    reason: "no implementation supplied".to_string(),
                })
            }
            n => {
                return Err(DiError::InvalidRegistration {
                    contract: self.contract,
                    reason: format!("{} implementations supplied, expected exactly one", n),
                })
            }
        }
        let implementation = self.implementations.remove(0);
        Registration::new(self.contract, implementation, self.lifetime)
    }
}

/// Cache slot identity for activated instances.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum CacheKey {
    /// Position in the compiled registry.
    Registration(usize),
    /// A closed contract served by an open generic registration.
    Closed(ServiceType),
}

/// Compiled, read-only registry owned by a provider.
pub(crate) struct Registry {
    entries: Vec<Arc<Registration>>,
    by_contract: HashMap<ServiceType, Vec<usize>>,
}

impl Registry {
    pub(crate) fn compile(registrations: Vec<Registration>) -> Self {
        let mut by_contract: HashMap<ServiceType, Vec<usize>> = HashMap::new();
        let entries = registrations
            .into_iter()
            .enumerate()
            .map(|(index, registration)| {
                by_contract
                    .entry(registration.contract().clone())
                    .or_default()
                    .push(index);
                Arc::new(registration)
            })
            .collect();
        Self {
            entries,
            by_contract,
        }
    }

    /// Last registration for `contract`.
    pub(crate) fn last(&self, contract: &ServiceType) -> Option<(usize, &Arc<Registration>)> {
        let index = *self.by_contract.get(contract)?.last()?;
        Some((index, &self.entries[index]))
    }

    /// Every registration for `contract`, in registration order.
    pub(crate) fn all<'a>(
        &'a self,
        contract: &ServiceType,
    ) -> impl Iterator<Item = (usize, &'a Arc<Registration>)> + 'a {
        self.by_contract
            .get(contract)
            .into_iter()
            .flatten()
            .map(move |&index| (index, &self.entries[index]))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &Arc<Registration>)> {
        self.entries.iter().enumerate()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
