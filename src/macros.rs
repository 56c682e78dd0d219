/// Implements [`crate::Implements`] of a type for the trait objects it can be used as
///
/// # Examples
/// ```rust
/// use injecta::{implements, Arguments, Injectable, InstantiateErrorKind};
///
/// trait Reader: Send + Sync {}
/// trait Writer: Send + Sync {}
///
/// struct File;
///
/// impl Reader for File {}
/// impl Writer for File {}
///
/// impl Injectable for File {
///     fn construct(_: Arguments) -> Result<Self, InstantiateErrorKind> {
///         Ok(Self)
///     }
/// }
///
/// implements!(File => dyn Reader, dyn Writer);
/// ```
#[macro_export]
macro_rules! implements {
    ($implementation:ty => $($contract:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$contract> for $implementation {
                #[inline]
                fn upcast(this: $crate::macros_utils::Arc<Self>) -> $crate::macros_utils::Arc<$contract> {
                    this
                }
            }
        )+
    };
}
