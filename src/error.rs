//! Error types for the dependency injection container.

use crate::service_type::ServiceType;

/// Dependency injection errors
///
/// Every failure is raised at the call that triggered it: registration,
/// build or resolution. "Not registered" is not an error for
/// [`resolve`](crate::ResolverCore::resolve), which returns `Ok(None)`;
/// it only becomes [`DiError::NotFound`] through the `*_required` entry
/// points.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{DiError, ServiceCollection, Resolver, ServiceType};
///
/// let provider = ServiceCollection::new().build();
/// assert!(provider.get::<String>().unwrap().is_none());
///
/// match provider.get_required::<String>() {
///     Err(DiError::NotFound(ty)) => assert_eq!(ty, ServiceType::of::<String>()),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// Registration supplied zero or several implementations, or an
    /// implementation that can not serve the contract
    #[error("invalid registration for {contract}: {reason}")]
    InvalidRegistration { contract: ServiceType, reason: String },
    /// Lifetime name outside of singleton/scoped/transient
    #[error("invalid service lifetime: {0:?}")]
    InvalidLifetime(String),
    /// Implementation type declares no constructor
    #[error("no constructor declared for {0}")]
    NoConstructor(ServiceType),
    /// Every constructor has a parameter the container can not satisfy
    #[error("no constructor of {0} has only resolvable parameters")]
    NoResolvableConstructor(ServiceType),
    /// A required constructor parameter is not registered and has no default
    #[error("unable to resolve {dependency} while activating {requested_by}")]
    UnresolvedDependency {
        dependency: ServiceType,
        requested_by: ServiceType,
    },
    /// Circular dependency detected (includes path)
    #[error("circular dependency: {}", chain(.0))]
    Circular(Vec<ServiceType>),
    /// Scoped service requested from the root provider with scope validation on
    #[error("cannot resolve scoped service {0} from the root provider")]
    ScopedWithoutScope(ServiceType),
    /// Operation on a disposed provider or scope
    #[error("cannot access a disposed {0}")]
    Disposed(&'static str),
    /// Required service not registered
    #[error("service not found: {0}")]
    NotFound(ServiceType),
    /// Stored instance is not of the requested Rust type
    #[error("type mismatch for: {0}")]
    TypeMismatch(ServiceType),
    /// Build-time validation failed for a registration
    #[error("validation of {service} failed: {source}")]
    Validation {
        service: ServiceType,
        #[source]
        source: Box<DiError>,
    },
    /// Maximum recursion depth exceeded
    #[error("max depth {0} exceeded")]
    DepthExceeded(usize),
}

fn chain(path: &[ServiceType]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
