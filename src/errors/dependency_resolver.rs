use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use super::instantiate::InstantiateErrorKind;
use crate::any::ServiceKey;

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Service {key} isn't registered")]
    UnregisteredService { key: ServiceKey },
    #[error("Circular dependency detected: {}", Chain(chain))]
    CircularDependency { key: ServiceKey, chain: Vec<ServiceKey> },
    #[error("Dependency {expected} for parameter `{parameter}` of {service} not found")]
    DependencyNotFound {
        service: ServiceKey,
        parameter: &'static str,
        expected: ServiceKey,
    },
    #[error("Scoped service {key} can't be resolved without a scope")]
    ScopeMisuse { key: ServiceKey },
    #[error("Incorrect instance type. Actual: {actual}, expected: {expected}")]
    IncorrectType { expected: ServiceKey, actual: ServiceKey },
    #[error(transparent)]
    Instantiate(#[from] InstantiateErrorKind),
}

struct Chain<'a>(&'a [ServiceKey]);

impl Display for Chain<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = self.0.iter();
        if let Some(key) = keys.next() {
            write!(f, "{key}")?;
        }
        for key in keys {
            write!(f, " -> {key}")?;
        }
        Ok(())
    }
}
