//! Runtime type handles for contracts and implementations.
//!
//! A [`ServiceType`] identifies what a caller asks the container for. It is
//! one of three shapes:
//!
//! - a plain Rust type (`TypeId` plus its name for diagnostics),
//! - an unbound generic definition such as `Handler<>`,
//! - a closed generic instantiation such as `Handler<Order>`.
//!
//! Rust erases generic parameters at runtime, so generic shapes are described
//! explicitly through [`GenericDefinition`] rather than discovered.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity and arity of an unbound generic type, e.g. `Logger<>`.
///
/// The identity comes from a marker type `M`, so two definitions that share a
/// display name but use different markers never match.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{GenericDefinition, ServiceType};
///
/// struct HandlerFamily;
/// struct Order;
///
/// let handler = GenericDefinition::new::<HandlerFamily>("Handler", 1);
/// let closed = handler.close([ServiceType::of::<Order>()]);
///
/// assert!(closed.is_closed_generic());
/// assert_eq!(closed.generic_definition(), Some(handler));
/// assert_eq!(handler.to_string(), "Handler<>");
/// ```
#[derive(Clone, Copy)]
pub struct GenericDefinition {
    id: TypeId,
    name: &'static str,
    arity: usize,
}

impl GenericDefinition {
    /// Declares a generic definition identified by the marker type `M`.
    pub fn new<M: ?Sized + 'static>(name: &'static str, arity: usize) -> Self {
        Self {
            id: TypeId::of::<M>(),
            name,
            arity,
        }
    }

    /// Display name without type arguments.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of type parameters.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Closes the definition over `arguments`.
    ///
    /// No arity check happens here; a closed type with the wrong number of
    /// arguments simply never matches an open registration.
    pub fn close<I>(&self, arguments: I) -> ServiceType
    where
        I: IntoIterator<Item = ServiceType>,
    {
        ServiceType {
            repr: Repr::Closed {
                definition: *self,
                arguments: arguments.into_iter().collect(),
            },
        }
    }

    /// The unbound definition as a requestable service type.
    pub fn as_service_type(&self) -> ServiceType {
        ServiceType {
            repr: Repr::Definition(*self),
        }
    }
}

impl PartialEq for GenericDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.arity == other.arity
    }
}

impl Eq for GenericDefinition {}

impl Hash for GenericDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.arity.hash(state);
    }
}

impl fmt::Display for GenericDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.name, ",".repeat(self.arity.saturating_sub(1)))
    }
}

impl fmt::Debug for GenericDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Runtime handle of a contract or implementation type.
///
/// Equality and hashing ignore display names: plain types compare by
/// `TypeId`, generic shapes by definition identity and type arguments.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::ServiceType;
///
/// trait Clock: Send + Sync {}
///
/// assert_eq!(ServiceType::of::<String>(), ServiceType::of::<String>());
/// assert_ne!(ServiceType::of::<String>(), ServiceType::of::<dyn Clock>());
/// assert!(ServiceType::of::<String>().name().contains("String"));
/// ```
#[derive(Clone)]
pub struct ServiceType {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Type { id: TypeId, name: &'static str },
    Definition(GenericDefinition),
    Closed {
        definition: GenericDefinition,
        arguments: Arc<[ServiceType]>,
    },
}

impl ServiceType {
    /// Handle for the Rust type `T`, including trait objects like `dyn Job`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            repr: Repr::Type {
                id: TypeId::of::<T>(),
                name: type_name::<T>(),
            },
        }
    }

    /// Human readable name, with type arguments for closed generics.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// `TypeId` of a plain Rust type; generic shapes have none.
    pub fn type_id(&self) -> Option<TypeId> {
        match &self.repr {
            Repr::Type { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// True for an unbound definition such as `Handler<>`.
    pub fn is_generic_definition(&self) -> bool {
        matches!(self.repr, Repr::Definition(_))
    }

    /// True for an instantiation such as `Handler<Order>`.
    pub fn is_closed_generic(&self) -> bool {
        matches!(self.repr, Repr::Closed { .. })
    }

    /// The generic definition behind an unbound or closed generic type.
    pub fn generic_definition(&self) -> Option<GenericDefinition> {
        match &self.repr {
            Repr::Definition(definition) | Repr::Closed { definition, .. } => Some(*definition),
            Repr::Type { .. } => None,
        }
    }

    /// Type arguments of a closed generic; empty for every other shape.
    pub fn type_arguments(&self) -> &[ServiceType] {
        match &self.repr {
            Repr::Closed { arguments, .. } => arguments,
            _ => &[],
        }
    }

    pub(crate) fn closed_parts(&self) -> Option<(GenericDefinition, &[ServiceType])> {
        match &self.repr {
            Repr::Closed {
                definition,
                arguments,
            } => Some((*definition, arguments)),
            _ => None,
        }
    }
}

impl From<GenericDefinition> for ServiceType {
    fn from(definition: GenericDefinition) -> Self {
        definition.as_service_type()
    }
}

impl PartialEq for ServiceType {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Type { id: a, .. }, Repr::Type { id: b, .. }) => a == b,
            (Repr::Definition(a), Repr::Definition(b)) => a == b,
            (
                Repr::Closed {
                    definition: a,
                    arguments: args_a,
                },
                Repr::Closed {
                    definition: b,
                    arguments: args_b,
                },
            ) => a == b && args_a == args_b,
            _ => false,
        }
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.repr {
            Repr::Type { id, .. } => {
                0u8.hash(state);
                id.hash(state);
            }
            Repr::Definition(definition) => {
                1u8.hash(state);
                definition.hash(state);
            }
            Repr::Closed {
                definition,
                arguments,
            } => {
                2u8.hash(state);
                definition.hash(state);
                arguments.hash(state);
            }
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Type { name, .. } => f.write_str(name),
            Repr::Definition(definition) => fmt::Display::fmt(definition, f),
            Repr::Closed {
                definition,
                arguments,
            } => {
                write!(f, "{}<", definition.name())?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(argument, f)?;
                }
                f.write_str(">")
            }
        }
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
