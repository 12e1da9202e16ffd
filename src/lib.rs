//! # ferrous-container
//!
//! A dependency-resolution container: register contracts against
//! implementations, build object graphs from constructor descriptors, and
//! manage instance lifetime across isolated scopes.
//!
//! ## Features
//!
//! - **Lifetimes**: Singleton, Scoped and Transient services
//! - **Constructor descriptors**: types publish their constructors; the container picks the richest one it can satisfy
//! - **Open generics**: register `Repo<>` once and resolve `Repo<Order>`, `Repo<Invoice>`, ...
//! - **Collections**: every registration of a contract, in registration order
//! - **Circular dependency detection**: reported with the full chain, never a stack overflow
//! - **Disposal**: scopes and the root provider release what they own
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_container::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! services.add_transient_factory::<UserService, _>(|resolver| {
//!     Ok(Arc::new(UserService {
//!         db: resolver.get_required::<Database>()?,
//!     }))
//! });
//!
//! let provider = services.build();
//! let user_service = provider.get_required::<UserService>().unwrap();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: Created once per provider and shared by every scope
//! - **Scoped**: Created once per [`Scope`]
//! - **Transient**: Created fresh on every resolution
//!
//! ## Constructor descriptors
//!
//! ```rust
//! use ferrous_container::{Constructor, Implements, Injectable, Parameter, Resolver, ServiceCollection};
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync { fn now(&self) -> u64; }
//! struct SystemClock;
//! impl Clock for SystemClock { fn now(&self) -> u64 { 1_700_000_000 } }
//! impl Implements<dyn Clock> for SystemClock {
//!     fn upcast(self: Arc<Self>) -> Arc<dyn Clock> { self }
//! }
//! impl Injectable for SystemClock {
//!     fn constructors() -> Vec<Constructor> {
//!         vec![Constructor::new(Vec::new(), |_| Ok(SystemClock))]
//!     }
//! }
//!
//! struct Job { clock: Arc<dyn Clock> }
//! impl Injectable for Job {
//!     fn constructors() -> Vec<Constructor> {
//!         vec![Constructor::new(vec![Parameter::of::<dyn Clock>()], |args| {
//!             Ok(Job { clock: args.get::<dyn Clock>(0)? })
//!         })]
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton_type::<dyn Clock, SystemClock>();
//! services.add_transient_self::<Job>();
//!
//! let provider = services.build();
//! assert_eq!(provider.get_required::<Job>().unwrap().clock.now(), 1_700_000_000);
//! ```

pub mod collection;
pub mod constructor;
pub mod descriptors;
pub mod error;
pub mod generic;
pub mod instance;
pub mod lifetime;
pub mod options;
pub mod provider;
pub mod registration;
pub mod service_type;
pub mod traits;

mod internal;

pub use collection::{ServiceCollection, ServiceCollectionExt, ServiceModule};
pub use constructor::{Arguments, Constructor, Implements, Injectable, Parameter, ParameterKind, TypeDescriptor};
pub use descriptors::{ImplementationKind, ServiceDescriptor};
pub use error::{DiError, DiResult};
pub use generic::GenericImplementation;
pub use instance::Instance;
pub use lifetime::Lifetime;
pub use options::ServiceProviderOptions;
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use registration::{Factory, Implementation, ImplementationType, Registration, RegistrationBuilder};
pub use service_type::{GenericDefinition, ServiceType};
pub use traits::{Dispose, Resolver, ResolverCore};
