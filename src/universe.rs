use alloc::{collections::BTreeMap, vec, vec::Vec};
use core::marker::PhantomData;
use tracing::debug;

use crate::{
    any::ServiceKey,
    discovery,
    errors::RegisterErrorKind,
    inject::{Implements, Injectable},
    instantiator::Constructor,
};

/// Abstract service contract with the names of the operations an implementation has to expose
#[derive(Debug, Clone, Copy)]
pub struct Contract {
    key: ServiceKey,
    operations: &'static [&'static str],
}

impl Contract {
    #[inline]
    #[must_use]
    pub fn of<S>(operations: &'static [&'static str]) -> Self
    where
        S: ?Sized + 'static,
    {
        Self {
            key: ServiceKey::of::<S>(),
            operations,
        }
    }

    #[inline]
    #[must_use]
    pub const fn key(&self) -> ServiceKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub const fn operations(&self) -> &'static [&'static str] {
        self.operations
    }
}

/// Known way to use a concrete type as `contract`
#[derive(Clone, Copy)]
pub(crate) struct Conversion {
    pub(crate) contract: ServiceKey,
    /// Declared with [`KnownTypeBuilder::implements`]
    pub(crate) nominal: bool,
    pub(crate) constructor: Constructor,
}

/// Concrete type known to the container with the contracts it can be used as
#[derive(Clone)]
pub struct KnownType {
    key: ServiceKey,
    conversions: Vec<Conversion>,
    operations: &'static [&'static str],
}

impl KnownType {
    #[inline]
    #[must_use]
    pub fn builder<T: Injectable>() -> KnownTypeBuilder<T> {
        KnownTypeBuilder::new()
    }

    #[inline]
    #[must_use]
    pub const fn key(&self) -> ServiceKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub const fn operations(&self) -> &'static [&'static str] {
        self.operations
    }

    /// Whether the type declares itself an implementation of `contract`
    #[must_use]
    pub fn implements(&self, contract: &ServiceKey) -> bool {
        self.conversion(contract).is_some_and(|conversion| conversion.nominal)
    }

    /// Whether the type can be used as `contract`, declared or structurally
    #[must_use]
    pub fn converts_to(&self, contract: &ServiceKey) -> bool {
        self.conversion(contract).is_some()
    }

    #[must_use]
    pub(crate) fn conversion(&self, contract: &ServiceKey) -> Option<&Conversion> {
        self.conversions.iter().find(|conversion| conversion.contract == *contract)
    }
}

pub struct KnownTypeBuilder<T> {
    conversions: Vec<Conversion>,
    operations: &'static [&'static str],
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> KnownTypeBuilder<T> {
    fn new() -> Self {
        Self {
            conversions: vec![Conversion {
                contract: ServiceKey::of::<T>(),
                nominal: true,
                constructor: Constructor::of::<T, T>(),
            }],
            operations: &[],
            _marker: PhantomData,
        }
    }

    /// Declares `T` an implementation of `S`
    #[must_use]
    pub fn implements<S>(self) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Implements<S>,
    {
        self.conversion::<S>(true)
    }

    /// Makes `T` usable as `S` without declaring it an implementation.
    /// Such a type is discovered if it lists every operation of `S`, or by its name if it lists none.
    #[must_use]
    pub fn conforms_to<S>(self) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Implements<S>,
    {
        self.conversion::<S>(false)
    }

    #[must_use]
    pub fn operations(mut self, operations: &'static [&'static str]) -> Self {
        self.operations = operations;
        self
    }

    #[must_use]
    pub fn build(self) -> KnownType {
        KnownType {
            key: ServiceKey::of::<T>(),
            conversions: self.conversions,
            operations: self.operations,
        }
    }

    fn conversion<S>(mut self, nominal: bool) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Implements<S>,
    {
        let conversion = Conversion {
            contract: ServiceKey::of::<S>(),
            nominal,
            constructor: Constructor::of::<S, T>(),
        };
        match self.conversions.iter_mut().find(|known| known.contract == conversion.contract) {
            Some(known) => *known = conversion,
            None => self.conversions.push(conversion),
        }
        self
    }
}

impl<T: Injectable> From<KnownTypeBuilder<T>> for KnownType {
    #[inline]
    fn from(builder: KnownTypeBuilder<T>) -> Self {
        builder.build()
    }
}

/// Contracts and concrete types known to a container.
///
/// The order types are added in is the order implementation discovery enumerates them,
/// the first of equally scored candidates wins.
///
/// # Examples
/// ```rust
/// use injecta::{implements, Arguments, Injectable, InstantiateErrorKind, KnownType, TypeUniverse};
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str);
/// }
///
/// struct FileLogger;
///
/// impl Logger for FileLogger {
///     fn log(&self, _: &str) {}
/// }
///
/// impl Injectable for FileLogger {
///     fn construct(_: Arguments) -> Result<Self, InstantiateErrorKind> {
///         Ok(Self)
///     }
/// }
///
/// implements!(FileLogger => dyn Logger);
///
/// let universe = TypeUniverse::new()
///     .contract::<dyn Logger>(&["log"])
///     .with(KnownType::builder::<FileLogger>().implements::<dyn Logger>().operations(&["log"]));
///
/// assert_eq!(universe.discover::<dyn Logger>().unwrap().short_name(), "FileLogger");
/// ```
#[derive(Default, Clone)]
pub struct TypeUniverse {
    contracts: BTreeMap<ServiceKey, Contract>,
    types: Vec<KnownType>,
}

impl TypeUniverse {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            contracts: BTreeMap::new(),
            types: Vec::new(),
        }
    }

    /// Declares `S` abstract, it can be registered without an implementation only through discovery
    #[must_use]
    pub fn contract<S>(mut self, operations: &'static [&'static str]) -> Self
    where
        S: ?Sized + 'static,
    {
        self.insert_contract(Contract::of::<S>(operations));
        self
    }

    #[must_use]
    pub fn with(mut self, known: impl Into<KnownType>) -> Self {
        self.insert(known);
        self
    }

    pub fn insert(&mut self, known: impl Into<KnownType>) {
        let known = known.into();
        debug!(known_type = known.key.name, "Known type added");
        self.types.push(known);
    }

    pub fn insert_contract(&mut self, contract: Contract) {
        debug!(contract = contract.key.name, "Contract added");
        self.contracts.insert(contract.key, contract);
    }

    #[inline]
    #[must_use]
    pub fn is_contract(&self, key: &ServiceKey) -> bool {
        self.contracts.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub fn contract_operations(&self, key: &ServiceKey) -> Option<&'static [&'static str]> {
        self.contracts.get(key).map(Contract::operations)
    }

    #[inline]
    #[must_use]
    pub fn known(&self) -> &[KnownType] {
        &self.types
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Finds the implementation registering contract `S` without an explicit one would use
    ///
    /// # Errors
    /// Returns [`RegisterErrorKind::ImplementationNotFound`] if no known type qualifies
    pub fn discover<S>(&self) -> Result<ServiceKey, RegisterErrorKind>
    where
        S: ?Sized + 'static,
    {
        self.discover_conversion(ServiceKey::of::<S>())
            .map(|conversion| conversion.constructor.implementation)
    }

    pub(crate) fn discover_conversion(&self, contract: ServiceKey) -> Result<&Conversion, RegisterErrorKind> {
        let operations = self.contract_operations(&contract).unwrap_or(&[]);
        discovery::select(contract, operations, &self.types).ok_or(RegisterErrorKind::ImplementationNotFound { contract })
    }

    /// Constructor of a known concrete type as itself
    #[must_use]
    pub(crate) fn self_constructor(&self, key: &ServiceKey) -> Option<Constructor> {
        self.types
            .iter()
            .find(|known| known.key == *key)
            .and_then(|known| known.conversion(key))
            .map(|conversion| conversion.constructor)
    }
}
