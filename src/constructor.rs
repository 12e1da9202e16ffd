//! Constructor descriptors.
//!
//! Rust has no runtime reflection, so a type that the container builds on
//! its own publishes how to do it: a list of [`Constructor`]s, each an
//! ordered list of [`Parameter`]s plus a build function over the resolved
//! [`Arguments`]. A [`TypeDescriptor`] bundles those constructors with the
//! contracts the type can be served as.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::instance::{downcast, into_instance, Instance};
use crate::service_type::ServiceType;
use crate::traits::Dispose;

type DefaultFn = Arc<dyn Fn() -> Instance + Send + Sync>;
type BuildFn = Arc<dyn Fn(&Arguments) -> DiResult<Constructed> + Send + Sync>;
type CastFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// How a constructor parameter is satisfied.
#[derive(Clone)]
pub enum ParameterKind {
    /// Must resolve; otherwise activation fails with
    /// [`DiError::UnresolvedDependency`].
    Required,
    /// Resolved when registered, else the default value (if any), else
    /// left missing.
    Optional(Option<DefaultFn>),
    /// Every registration of the type, possibly none.
    Collection,
}

impl fmt::Debug for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::Required => f.write_str("Required"),
            ParameterKind::Optional(default) => {
                write!(f, "Optional(default: {})", default.is_some())
            }
            ParameterKind::Collection => f.write_str("Collection"),
        }
    }
}

/// A single constructor parameter.
#[derive(Clone, Debug)]
pub struct Parameter {
    service_type: ServiceType,
    kind: ParameterKind,
}

impl Parameter {
    /// Required dependency on `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::service(ServiceType::of::<T>())
    }

    /// Required dependency on a runtime type, e.g. a closed generic.
    pub fn service(service_type: ServiceType) -> Self {
        Self {
            service_type,
            kind: ParameterKind::Required,
        }
    }

    /// Every registration of `T`.
    pub fn all<T: ?Sized + 'static>() -> Self {
        Self::all_of(ServiceType::of::<T>())
    }

    /// Every registration of a runtime type.
    pub fn all_of(service_type: ServiceType) -> Self {
        Self {
            service_type,
            kind: ParameterKind::Collection,
        }
    }

    /// Optional dependency on `T` with no default.
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self {
            service_type: ServiceType::of::<T>(),
            kind: ParameterKind::Optional(None),
        }
    }

    /// Optional dependency on `T` that falls back to `default()` when `T` is
    /// not registered.
    pub fn with_default<T, F>(default: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            service_type: ServiceType::of::<T>(),
            kind: ParameterKind::Optional(Some(Arc::new(move || into_instance(default())))),
        }
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, ParameterKind::Collection)
    }

    /// True when the parameter can be left unresolved.
    pub fn is_optional(&self) -> bool {
        matches!(self.kind, ParameterKind::Optional(_))
    }

    pub(crate) fn default_value(&self) -> Option<Instance> {
        match &self.kind {
            ParameterKind::Optional(Some(default)) => Some(default()),
            _ => None,
        }
    }
}

pub(crate) enum Argument {
    One(Instance),
    Many(Vec<Instance>),
    Missing,
}

/// Resolved constructor arguments, in parameter order.
pub struct Arguments {
    owner: ServiceType,
    values: Vec<(ServiceType, Argument)>,
}

impl Arguments {
    pub(crate) fn new(owner: ServiceType, values: Vec<(ServiceType, Argument)>) -> Self {
        Self { owner, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The resolved value of a required (or defaulted) parameter.
    pub fn get<T>(&self, index: usize) -> DiResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let (service_type, _) = self.slot(index)?;
        self.get_optional::<T>(index)?
            .ok_or_else(|| DiError::UnresolvedDependency {
                dependency: service_type.clone(),
                requested_by: self.owner.clone(),
            })
    }

    /// The resolved value of an optional parameter, `None` when it was left
    /// missing.
    pub fn get_optional<T>(&self, index: usize) -> DiResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let (service_type, argument) = self.slot(index)?;
        match argument {
            Argument::One(instance) => downcast::<T>(instance)
                .map(Some)
                .ok_or_else(|| DiError::TypeMismatch(service_type.clone())),
            Argument::Missing => Ok(None),
            Argument::Many(_) => Err(DiError::TypeMismatch(service_type.clone())),
        }
    }

    /// The resolved values of a collection parameter.
    pub fn get_all<T>(&self, index: usize) -> DiResult<Vec<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let (service_type, argument) = self.slot(index)?;
        match argument {
            Argument::Many(instances) => instances
                .iter()
                .map(|instance| {
                    downcast::<T>(instance).ok_or_else(|| DiError::TypeMismatch(service_type.clone()))
                })
                .collect(),
            _ => Err(DiError::TypeMismatch(service_type.clone())),
        }
    }

    fn slot(&self, index: usize) -> DiResult<(&ServiceType, &Argument)> {
        self.values
            .get(index)
            .map(|(service_type, argument)| (service_type, argument))
            .ok_or_else(|| DiError::InvalidRegistration {
                contract: self.owner.clone(),
                reason: format!(
                    "constructor argument {} requested but only {} declared",
                    index,
                    self.values.len()
                ),
            })
    }
}

/// Result of invoking a constructor: the value plus the disposables it owns.
pub(crate) struct Constructed {
    pub(crate) instance: Instance,
    pub(crate) disposers: Vec<Arc<dyn Dispose>>,
}

impl Constructed {
    pub(crate) fn shared(instance: Instance) -> Self {
        Self {
            instance,
            disposers: Vec::new(),
        }
    }
}

/// One way of building an implementation type.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Constructor, Parameter, ServiceCollection, Injectable, Resolver};
/// use std::sync::Arc;
///
/// struct Settings { retries: u32 }
/// struct Client { settings: Arc<Settings> }
///
/// impl Injectable for Client {
///     fn constructors() -> Vec<Constructor> {
///         vec![Constructor::new(vec![Parameter::of::<Settings>()], |args| {
///             Ok(Client { settings: args.get::<Settings>(0)? })
///         })]
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Settings { retries: 3 });
/// services.add_transient_self::<Client>();
///
/// let provider = services.build();
/// assert_eq!(provider.get_required::<Client>().unwrap().settings.retries, 3);
/// ```
#[derive(Clone)]
pub struct Constructor {
    parameters: Vec<Parameter>,
    build: BuildFn,
}

impl Constructor {
    /// Constructor producing an `I` from resolved arguments.
    pub fn new<I, F>(parameters: Vec<Parameter>, build: F) -> Self
    where
        I: Send + Sync + 'static,
        F: Fn(&Arguments) -> DiResult<I> + Send + Sync + 'static,
    {
        Self {
            parameters,
            build: Arc::new(move |arguments| {
                build(arguments).map(|value| Constructed::shared(into_instance(Arc::new(value))))
            }),
        }
    }

    /// Like [`new`](Self::new), and the built value is released through
    /// [`Dispose`] by whichever cache ends up owning it.
    pub fn disposable<I, F>(parameters: Vec<Parameter>, build: F) -> Self
    where
        I: Dispose,
        F: Fn(&Arguments) -> DiResult<I> + Send + Sync + 'static,
    {
        Self {
            parameters,
            build: Arc::new(move |arguments| {
                let value = Arc::new(build(arguments)?);
                let disposer: Arc<dyn Dispose> = value.clone();
                Ok(Constructed {
                    instance: into_instance(value),
                    disposers: vec![disposer],
                })
            }),
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub(crate) fn invoke(&self, arguments: &Arguments) -> DiResult<Constructed> {
        (self.build)(arguments)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// A type that publishes its own constructors.
pub trait Injectable: Send + Sync + Sized + 'static {
    fn constructors() -> Vec<Constructor>;
}

/// Declares that `Self` can be served as the contract `C`.
///
/// Every type implements itself. Trait contracts need a one-line impl:
///
/// ```rust
/// use ferrous_container::Implements;
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {}
/// struct SystemClock;
/// impl Clock for SystemClock {}
///
/// impl Implements<dyn Clock> for SystemClock {
///     fn upcast(self: Arc<Self>) -> Arc<dyn Clock> { self }
/// }
/// ```
pub trait Implements<C: ?Sized + Send + Sync + 'static>: Send + Sync + 'static {
    fn upcast(self: Arc<Self>) -> Arc<C>;
}

impl<T: Send + Sync + 'static> Implements<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// An implementation type the container can construct.
///
/// Carries the type's runtime identity, its constructors, and the contracts
/// it is assignable to together with the conversion into each.
#[derive(Clone)]
pub struct TypeDescriptor {
    service_type: ServiceType,
    constructors: Vec<Constructor>,
    casts: Vec<(ServiceType, CastFn)>,
}

impl TypeDescriptor {
    /// Descriptor with no constructors, assignable only to itself.
    pub fn new(service_type: ServiceType) -> Self {
        let identity: CastFn = Arc::new(|instance| Some(instance.clone()));
        Self {
            casts: vec![(service_type.clone(), identity)],
            service_type,
            constructors: Vec::new(),
        }
    }

    /// Descriptor of an [`Injectable`] type.
    pub fn of<I: Injectable>() -> Self {
        Self::new(ServiceType::of::<I>()).with_constructors(I::constructors())
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_constructors<I>(mut self, constructors: I) -> Self
    where
        I: IntoIterator<Item = Constructor>,
    {
        self.constructors.extend(constructors);
        self
    }

    /// Makes the descriptor assignable to `contract`; values built as `I`
    /// are converted with `upcast`.
    ///
    /// `contract` is a runtime handle so closed generic contracts can be
    /// named, e.g. `Logger<Job>` for a value stored as `Arc<dyn Logger>`.
    pub fn implements<I, C, F>(mut self, contract: ServiceType, upcast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<I>) -> Arc<C> + Send + Sync + 'static,
    {
        let cast: CastFn =
            Arc::new(move |instance| downcast::<I>(instance).map(|value| into_instance(upcast(value))));
        self.casts.retain(|(existing, _)| *existing != contract);
        self.casts.push((contract, cast));
        self
    }

    /// [`implements`](Self::implements) for a plain contract type through
    /// [`Implements`].
    pub fn implements_type<I, C>(self) -> Self
    where
        I: Implements<C>,
        C: ?Sized + Send + Sync + 'static,
    {
        self.implements::<I, C, _>(ServiceType::of::<C>(), <I as Implements<C>>::upcast)
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn is_assignable_to(&self, contract: &ServiceType) -> bool {
        self.casts.iter().any(|(ty, _)| ty == contract)
    }

    pub(crate) fn cast_to(&self, contract: &ServiceType, instance: &Instance) -> Option<Instance> {
        self.casts
            .iter()
            .find(|(ty, _)| ty == contract)
            .and_then(|(_, cast)| cast(instance))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("service_type", &self.service_type)
            .field("constructors", &self.constructors.len())
            .field(
                "contracts",
                &self.casts.iter().map(|(ty, _)| ty).collect::<Vec<_>>(),
            )
            .finish()
    }
}
