//! Open generic implementations.
//!
//! Generic parameters do not exist at runtime, so an open implementation is
//! a template: given the type arguments of a requested closed contract it
//! produces a closed [`TypeDescriptor`], or declines when it does not
//! support those arguments. The engine closes the template on demand and
//! caches the result per closed contract.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::constructor::TypeDescriptor;
use crate::service_type::{GenericDefinition, ServiceType};

type Template = Arc<dyn Fn(&[ServiceType]) -> Option<TypeDescriptor> + Send + Sync>;

/// An unbound implementation type such as `ConsoleLogger<>`.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{
///     Constructor, GenericDefinition, GenericImplementation, Lifetime, Resolver,
///     ServiceCollection, ServiceType, TypeDescriptor,
/// };
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn category(&self) -> String;
/// }
///
/// struct ConsoleLogger { category: ServiceType }
/// impl Logger for ConsoleLogger {
///     fn category(&self) -> String { self.category.name() }
/// }
///
/// struct LoggerFamily;
/// struct ConsoleLoggerFamily;
/// struct Job;
///
/// let logger = GenericDefinition::new::<LoggerFamily>("Logger", 1);
/// let console = GenericDefinition::new::<ConsoleLoggerFamily>("ConsoleLogger", 1);
///
/// let open = GenericImplementation::new(console, move |args| {
///     let category = args[0].clone();
///     Some(
///         TypeDescriptor::new(console.close(args.iter().cloned()))
///             .with_constructor(Constructor::new(Vec::new(), move |_| {
///                 Ok(ConsoleLogger { category: category.clone() })
///             }))
///             .implements::<ConsoleLogger, dyn Logger, _>(
///                 logger.close(args.iter().cloned()),
///                 |value| value as Arc<dyn Logger>,
///             ),
///     )
/// });
///
/// let mut services = ServiceCollection::new();
/// services.add_open_generic(logger, open, Lifetime::Singleton).unwrap();
/// let provider = services.build();
///
/// let job_logger = logger.close([ServiceType::of::<Job>()]);
/// let resolved = provider.get_required_service::<dyn Logger>(&job_logger).unwrap();
/// assert!(resolved.category().ends_with("Job"));
/// ```
#[derive(Clone)]
pub struct GenericImplementation {
    definition: GenericDefinition,
    template: Template,
}

impl GenericImplementation {
    /// Open implementation `definition`, closed by `template`.
    ///
    /// The template receives the requested contract's type arguments and
    /// must return a descriptor whose service type is
    /// `definition.close(arguments)` and which is assignable to the closed
    /// contract. Anything else is treated as "no match".
    pub fn new<F>(definition: GenericDefinition, template: F) -> Self
    where
        F: Fn(&[ServiceType]) -> Option<TypeDescriptor> + Send + Sync + 'static,
    {
        Self {
            definition,
            template: Arc::new(template),
        }
    }

    pub fn definition(&self) -> GenericDefinition {
        self.definition
    }

    /// Closes the template for the closed `contract`.
    pub(crate) fn close(&self, contract: &ServiceType) -> Option<TypeDescriptor> {
        let (_, arguments) = contract.closed_parts()?;
        if arguments.len() != self.definition.arity() {
            trace!(%contract, implementation = %self.definition, "arity mismatch");
            return None;
        }

        let descriptor = (self.template)(arguments)?;
        let expected = self.definition.close(arguments.iter().cloned());
        if *descriptor.service_type() != expected {
            trace!(%contract, produced = %descriptor.service_type(), %expected, "template produced a foreign type");
            return None;
        }
        if !descriptor.is_assignable_to(contract) {
            trace!(%contract, implementation = %expected, "closed implementation not assignable");
            return None;
        }
        Some(descriptor)
    }
}

impl fmt::Debug for GenericImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericImplementation")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}
