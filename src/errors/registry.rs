use crate::any::ServiceKey;

#[derive(thiserror::Error, Debug)]
pub enum RegisterErrorKind {
    #[error("Implementation for {contract} not found in the type universe")]
    ImplementationNotFound { contract: ServiceKey },
    #[error("Invalid registration of {key}: {reason}")]
    Configuration { key: ServiceKey, reason: &'static str },
}
