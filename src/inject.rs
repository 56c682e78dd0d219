use alloc::{sync::Arc, vec::Vec};

use crate::{
    dependency::{Arguments, Parameter},
    errors::InstantiateErrorKind,
};

/// A concrete type the container can build through constructor injection.
///
/// [`Self::parameters`] describes what the constructor needs, the container resolves every parameter with a declared
/// service key and passes the results to [`Self::construct`].
///
/// # Examples
/// ```rust
/// use injecta::{Arguments, Injectable, InstantiateErrorKind, Parameter};
///
/// struct Worker {
///     retry_count: u32,
/// }
///
/// impl Injectable for Worker {
///     fn parameters() -> Vec<Parameter> {
///         vec![Parameter::with_default("retry_count", 3u32)]
///     }
///
///     fn construct(arguments: Arguments) -> Result<Self, InstantiateErrorKind> {
///         Ok(Self {
///             retry_count: *arguments.get::<u32>("retry_count")?,
///         })
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    #[must_use]
    fn parameters() -> Vec<Parameter> {
        Vec::new()
    }

    fn construct(arguments: Arguments) -> Result<Self, InstantiateErrorKind>;

    /// Called once when the scope (or container) caching the instance is disposed.
    /// Errors are logged and suppressed.
    fn dispose(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Conversion of an implementation into the service `S` it's registered for.
///
/// Every [`Injectable`] implements itself, implementations of trait objects are usually written with [`crate::implements!`].
pub trait Implements<S: ?Sized>: Injectable {
    fn upcast(this: Arc<Self>) -> Arc<S>;
}

impl<T: Injectable> Implements<T> for T {
    #[inline]
    fn upcast(this: Arc<Self>) -> Arc<T> {
        this
    }
}
