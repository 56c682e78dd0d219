#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod container;
pub(crate) mod dependency;
pub(crate) mod dependency_resolver;
pub(crate) mod discovery;
pub(crate) mod errors;
pub(crate) mod finalizer;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod lifetime;
pub(crate) mod registry;
pub(crate) mod scope;
pub(crate) mod universe;

pub mod macros_utils;

#[cfg(feature = "auto")]
pub mod auto;

pub use any::ServiceKey;
pub use config::Config;
pub use container::Container;
pub use dependency::{Arguments, Parameter};
pub use dependency_resolver::Resolver;
pub use errors::{InstantiateErrorKind, InstantiatorErrorKind, RegisterErrorKind, ResolveErrorKind};
pub use finalizer::Finalizer;
pub use inject::{Implements, Injectable};
pub use lifetime::Lifetime;
pub use scope::Scope;
pub use universe::{Contract, KnownType, KnownTypeBuilder, TypeUniverse};
