//! Construction of concrete implementation types from their descriptors.

use tracing::trace;

use crate::constructor::{Argument, Arguments, Constructed, Constructor, Parameter, ParameterKind, TypeDescriptor};
use crate::error::{DiError, DiResult};
use crate::internal::ResolutionStack;
use crate::provider::{Scope, ServiceProvider};
use crate::service_type::ServiceType;

/// Builds `descriptor` and converts the value into `contract`.
pub(super) fn activate(
    provider: &ServiceProvider,
    scope: Option<&Scope>,
    stack: &ResolutionStack,
    contract: &ServiceType,
    descriptor: &TypeDescriptor,
) -> DiResult<Constructed> {
    let owner = descriptor.service_type();
    let constructor = select_constructor(provider, scope, descriptor)?;

    let mut values = Vec::with_capacity(constructor.parameters().len());
    for parameter in constructor.parameters() {
        let argument = resolve_argument(provider, scope, stack, owner, parameter)?;
        values.push((parameter.service_type().clone(), argument));
    }

    let constructed = constructor.invoke(&Arguments::new(owner.clone(), values))?;
    trace!(implementation = %owner, %contract, "activated implementation type");

    let instance = descriptor
        .cast_to(contract, &constructed.instance)
        .ok_or_else(|| DiError::TypeMismatch(contract.clone()))?;
    Ok(Constructed {
        instance,
        disposers: constructed.disposers,
    })
}

/// A single constructor is used as is. With several, the one with the most
/// parameters among those the container can satisfy wins; ties go to the
/// first declared.
fn select_constructor<'d>(
    provider: &ServiceProvider,
    scope: Option<&Scope>,
    descriptor: &'d TypeDescriptor,
) -> DiResult<&'d Constructor> {
    match descriptor.constructors() {
        [] => Err(DiError::NoConstructor(descriptor.service_type().clone())),
        [only] => Ok(only),
        constructors => constructors
            .iter()
            .rev()
            .filter(|constructor| {
                constructor
                    .parameters()
                    .iter()
                    .all(|parameter| satisfiable(provider, scope, parameter))
            })
            .max_by_key(|constructor| constructor.parameters().len())
            .ok_or_else(|| DiError::NoResolvableConstructor(descriptor.service_type().clone())),
    }
}

fn satisfiable(provider: &ServiceProvider, scope: Option<&Scope>, parameter: &Parameter) -> bool {
    match parameter.kind() {
        ParameterKind::Collection | ParameterKind::Optional(_) => true,
        ParameterKind::Required => provider.can_resolve(scope, parameter.service_type()),
    }
}

fn resolve_argument(
    provider: &ServiceProvider,
    scope: Option<&Scope>,
    stack: &ResolutionStack,
    owner: &ServiceType,
    parameter: &Parameter,
) -> DiResult<Argument> {
    let service_type = parameter.service_type();
    if parameter.is_collection() {
        return provider
            .resolve_all_in(scope, service_type, stack)
            .map(Argument::Many);
    }

    match provider.resolve_in(scope, service_type, stack)? {
        Some(instance) => Ok(Argument::One(instance)),
        None if parameter.is_optional() => Ok(parameter
            .default_value()
            .map_or(Argument::Missing, Argument::One)),
        None => Err(DiError::UnresolvedDependency {
            dependency: service_type.clone(),
            requested_by: owner.clone(),
        }),
    }
}
