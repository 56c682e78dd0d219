use crate::any::ServiceKey;

/// Errors produced by an implementation's own constructor
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error("Argument `{name}` wasn't passed to the constructor")]
    MissingArgument { name: &'static str },
    #[error("Argument `{name}` has incorrect type. Actual: {actual}, expected: {expected}")]
    IncorrectArgumentType {
        name: &'static str,
        expected: ServiceKey,
        actual: ServiceKey,
    },
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
