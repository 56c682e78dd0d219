//! Type universe collected from every crate linked into the binary.
//!
//! Entries are added with the re-exported [`distributed_slice`] attribute:
//! ```rust,ignore
//! use injecta::{auto::{distributed_slice, KNOWN_TYPES}, KnownType};
//!
//! #[distributed_slice(KNOWN_TYPES)]
//! #[linkme(crate = injecta::auto::linkme)]
//! static FILE_LOGGER: fn() -> KnownType = || KnownType::builder::<FileLogger>().implements::<dyn Logger>().build();
//! ```

use alloc::vec::Vec;
use tracing::debug;

pub use linkme::{self, distributed_slice};

use crate::universe::{Contract, KnownType, TypeUniverse};

#[distributed_slice]
pub static KNOWN_TYPES: [fn() -> KnownType];

#[distributed_slice]
pub static CONTRACTS: [fn() -> Contract];

impl TypeUniverse {
    /// Collects the entries of [`CONTRACTS`] and [`KNOWN_TYPES`].
    ///
    /// Link order isn't stable, so known types are ordered by their type name.
    #[must_use]
    pub fn collect() -> Self {
        let mut universe = Self::new();
        for contract in CONTRACTS.iter() {
            universe.insert_contract(contract());
        }

        let mut known: Vec<KnownType> = KNOWN_TYPES.iter().map(|known| known()).collect();
        known.sort_by(|a, b| a.key().name.cmp(b.key().name));
        for known in known {
            universe.insert(known);
        }

        debug!(known_types = universe.len(), "Type universe collected");
        universe
    }
}
