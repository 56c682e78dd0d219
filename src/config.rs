/// Config for a container
/// ## Fields
/// - `strict_interfaces`:
///   If `true`, registering a concrete service without an explicit implementation is rejected.
///   In lenient mode such a service is treated as its own implementation.
///
///   This does **not** affect abstract contracts, they're always resolved through discovery.
/// - `ambient_scope`:
///   If `true`, scoped services resolved outside of an explicit scope are cached in an implicit scope of the
///   resolution call, disposed when the call returns. Scoped dependencies of singletons are kept in the container's
///   root scope, disposed when the container is closed.
///   Otherwise both fail with [`crate::ResolveErrorKind::ScopeMisuse`].
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub strict_interfaces: bool,
    pub ambient_scope: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_interfaces: false,
            ambient_scope: true,
        }
    }
}
