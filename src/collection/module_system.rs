//! Service module system for modular registration.
//!
//! This module provides traits and functionality for organizing service
//! registrations into reusable modules.

use crate::{DiResult, ServiceCollection};

/// A module that can register services with a ServiceCollection.
///
/// Each module groups the registrations of one feature area so hosts can
/// compose them.
///
/// # Example
///
/// ```rust
/// use ferrous_container::{ServiceCollection, ServiceModule, DiResult, Resolver};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct UserConfig;
///
/// struct UserService;
/// impl UserService {
///     fn new(_config: Arc<UserConfig>) -> Self { Self }
/// }
///
/// struct UserModule;
///
/// impl ServiceModule for UserModule {
///     fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
///         services.add_singleton(UserConfig::default());
///         services.add_scoped_factory::<UserService, _>(|r| {
///             let config = r.get_required::<UserConfig>()?;
///             Ok(Arc::new(UserService::new(config)))
///         });
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut services = ServiceCollection::new();
/// services.add_module(UserModule)?;
/// let provider = services.build();
/// assert!(provider.create_scope().get::<UserService>()?.is_some());
/// # Ok(())
/// # }
/// ```
pub trait ServiceModule {
    /// Register this module's services with the ServiceCollection.
    fn register_services(self, services: &mut ServiceCollection) -> DiResult<()>;
}

impl ServiceCollection {
    /// Lets `module` add its registrations.
    pub fn add_module<M: ServiceModule>(&mut self, module: M) -> DiResult<&mut Self> {
        module.register_services(self)?;
        Ok(self)
    }
}

/// Extension trait for ServiceCollection that provides by-value module
/// chaining.
pub trait ServiceCollectionExt: Sized {
    /// Add a module and hand the collection back.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ferrous_container::{ServiceCollection, ServiceCollectionExt, ServiceModule, DiResult};
    ///
    /// struct DatabaseModule;
    /// impl ServiceModule for DatabaseModule {
    ///     fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
    ///         services.add_singleton(5432u16);
    ///         Ok(())
    ///     }
    /// }
    ///
    /// struct UserModule;
    /// impl ServiceModule for UserModule {
    ///     fn register_services(self, _: &mut ServiceCollection) -> DiResult<()> { Ok(()) }
    /// }
    ///
    /// # fn main() -> DiResult<()> {
    /// let services = ServiceCollection::new()
    ///     .with_module(DatabaseModule)?
    ///     .with_module(UserModule)?;
    /// assert!(services.contains::<u16>());
    /// # Ok(())
    /// # }
    /// ```
    fn with_module<M: ServiceModule>(self, module: M) -> DiResult<Self>;
}

impl ServiceCollectionExt for ServiceCollection {
    fn with_module<M: ServiceModule>(mut self, module: M) -> DiResult<Self> {
        module.register_services(&mut self)?;
        Ok(self)
    }
}
