//! Provider build options.

/// Options applied when a [`ServiceCollection`](crate::ServiceCollection) is
/// built into a provider.
///
/// With the `serde` feature the options deserialize from a host's
/// configuration; missing fields take their defaults.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{ServiceCollection, ServiceProviderOptions};
///
/// let options = ServiceProviderOptions::new().with_validate_on_build(true);
/// assert!(options.validate_scopes);
///
/// let provider = ServiceCollection::new().build_with_options(options).unwrap();
/// assert!(provider.options().validate_on_build);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ServiceProviderOptions {
    /// Reject Scoped services requested outside a scope. When off, such
    /// requests construct a fresh, uncached instance every time.
    pub validate_scopes: bool,
    /// Activate every registration once during build and fail fast on the
    /// first wiring error.
    pub validate_on_build: bool,
}

impl Default for ServiceProviderOptions {
    fn default() -> Self {
        Self {
            validate_scopes: true,
            validate_on_build: false,
        }
    }
}

impl ServiceProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validate_scopes(mut self, validate: bool) -> Self {
        self.validate_scopes = validate;
        self
    }

    pub fn with_validate_on_build(mut self, validate: bool) -> Self {
        self.validate_on_build = validate;
        self
    }
}
