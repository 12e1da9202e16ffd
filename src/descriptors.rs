//! Service descriptors for introspection and diagnostics.

use std::fmt;

use crate::lifetime::Lifetime;
use crate::registration::Registration;
use crate::service_type::ServiceType;

/// Which kind of implementation backs a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImplementationKind {
    /// Constructed by the container from constructor descriptors
    Type,
    /// Pre-built value supplied at registration
    Instance,
    /// Caller supplied factory function
    Factory,
}

impl fmt::Display for ImplementationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImplementationKind::Type => "type",
            ImplementationKind::Instance => "instance",
            ImplementationKind::Factory => "factory",
        })
    }
}

/// Service descriptor for introspection and diagnostics
///
/// A detached snapshot of a registration: contract, lifetime, and how it is
/// implemented. Useful for debugging wiring and for startup health checks.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{ImplementationKind, Lifetime, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct Repository { name: String }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory::<Repository, _>(|_| Ok(Arc::new(Repository { name: "users".into() })));
///
/// let descriptors = services.descriptors();
/// let db = descriptors.iter().find(|d| d.type_name().contains("Database")).unwrap();
/// assert_eq!(db.lifetime, Lifetime::Singleton);
/// assert_eq!(db.kind, ImplementationKind::Instance);
///
/// let scoped = descriptors.iter().filter(|d| d.lifetime == Lifetime::Scoped).count();
/// assert_eq!(scoped, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// The contract type
    pub contract: ServiceType,
    /// Service lifetime
    pub lifetime: Lifetime,
    /// How the contract is implemented
    pub kind: ImplementationKind,
    /// Implementation type, when it is a type the container constructs
    pub implementation_type: Option<ServiceType>,
}

impl ServiceDescriptor {
    /// Human readable contract name.
    pub fn type_name(&self) -> String {
        self.contract.name()
    }

    /// True for an unbound generic contract such as `Handler<>`.
    pub fn is_open_generic(&self) -> bool {
        self.contract.is_generic_definition()
    }
}

impl From<&Registration> for ServiceDescriptor {
    fn from(registration: &Registration) -> Self {
        Self {
            contract: registration.contract().clone(),
            lifetime: registration.lifetime(),
            kind: registration.kind(),
            implementation_type: registration.implementation_type(),
        }
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {}", self.contract, self.lifetime, self.kind)?;
        if let Some(implementation) = &self.implementation_type {
            write!(f, ": {}", implementation)?;
        }
        f.write_str(")")
    }
}
