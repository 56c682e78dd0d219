#[doc(hidden)]
pub use alloc::sync::Arc;
