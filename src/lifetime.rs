//! Service lifetime definitions.

use std::fmt;
use std::str::FromStr;

use crate::error::DiError;

/// Service lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{ServiceCollection, Resolver, Lifetime};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct Repository { db_url: String }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory::<Repository, _>(|r| {
///     let db = r.get_required::<Database>()?;
///     Ok(Arc::new(Repository { db_url: db.url.clone() }))
/// });
///
/// let provider = services.build();
/// let scope1 = provider.create_scope();
/// let scope2 = provider.create_scope();
///
/// let repo1a = scope1.get_required::<Repository>().unwrap();
/// let repo1b = scope1.get_required::<Repository>().unwrap();
/// let repo2 = scope2.get_required::<Repository>().unwrap();
/// assert!(Arc::ptr_eq(&repo1a, &repo1b));
/// assert!(!Arc::ptr_eq(&repo1a, &repo2));
/// assert_eq!("scoped".parse::<Lifetime>().unwrap(), Lifetime::Scoped);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Lifetime {
    /// Single instance per root provider, cached forever
    ///
    /// Shared across all scopes and threads. Dependencies of a singleton are
    /// always resolved from the root, never from the scope that asked.
    Singleton,
    /// Single instance per scope, cached for scope lifetime
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    /// Lower-case name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singleton" => Ok(Lifetime::Singleton),
            "scoped" => Ok(Lifetime::Scoped),
            "transient" => Ok(Lifetime::Transient),
            _ => Err(DiError::InvalidLifetime(s.to_string())),
        }
    }
}
