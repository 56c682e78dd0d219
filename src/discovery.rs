//! Selection of an implementation for a contract registered without one.
//!
//! Candidates are the known types declaring the contract and the types converting to it that expose every contract
//! operation. Only if there are none, converting types that don't list their operations are considered when their
//! name follows the contract's naming conventions.
//! The highest [`Score`] wins, the first enumerated candidate wins ties.

use alloc::vec::Vec;
use tracing::debug;

use crate::{
    any::ServiceKey,
    universe::{Conversion, KnownType},
};

const PROXIMITY_MAX: usize = 20;
const PROXIMITY_STEP: usize = 5;

/// Criteria in order of significance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Score {
    same_module: bool,
    same_package: bool,
    proximity: usize,
    preferred_name: bool,
}

impl Score {
    #[must_use]
    pub(crate) fn new(contract: &ServiceKey, candidate: &ServiceKey) -> Self {
        let depth_difference = contract.module_depth().abs_diff(candidate.module_depth());
        Self {
            same_module: contract.module_path() == candidate.module_path(),
            same_package: contract.package() == candidate.package(),
            proximity: PROXIMITY_MAX.saturating_sub(PROXIMITY_STEP * depth_difference),
            preferred_name: is_preferred_name(contract.short_name(), candidate.short_name()),
        }
    }
}

/// Contract name without an `I` prefix (`ILogger`) or an `Interface` suffix (`LoggerInterface`)
#[must_use]
pub(crate) fn base_name(contract: &str) -> &str {
    if let Some(rest) = contract.strip_prefix('I') {
        if rest.starts_with(|c: char| c.is_ascii_uppercase()) {
            return rest;
        }
    }
    match contract.strip_suffix("Interface") {
        Some(base) if !base.is_empty() => base,
        _ => contract,
    }
}

fn strip_implementation_suffix(name: &str) -> Option<&str> {
    name.strip_suffix("Implementation").or_else(|| name.strip_suffix("Impl"))
}

/// `Base`, `BaseImpl`, `BaseImplementation`, `DefaultBase` or `ConcreteBase`
#[must_use]
pub(crate) fn follows_convention(contract: &str, candidate: &str) -> bool {
    let base = base_name(contract);
    candidate == base
        || strip_implementation_suffix(candidate) == Some(base)
        || candidate.strip_prefix("Default") == Some(base)
        || candidate.strip_prefix("Concrete") == Some(base)
}

/// `Base`, `ContractImpl`, `ContractImplementation`, `BaseImpl` or `BaseImplementation`
#[must_use]
pub(crate) fn is_preferred_name(contract: &str, candidate: &str) -> bool {
    let base = base_name(contract);
    candidate == base || strip_implementation_suffix(candidate).is_some_and(|stripped| stripped == contract || stripped == base)
}

fn exposes_all(known: &KnownType, operations: &[&str]) -> bool {
    operations.iter().all(|operation| known.operations().contains(operation))
}

/// Picks the implementation for `contract` among `types`
pub(crate) fn select<'a>(contract: ServiceKey, operations: &[&str], types: &'a [KnownType]) -> Option<&'a Conversion> {
    let satisfying = candidates(types, &contract, |known| {
        known.implements(&contract) || exposes_all(known, operations)
    });
    if !satisfying.is_empty() {
        debug!(contract = contract.name, count = satisfying.len(), "Implementations found");
        return best(&contract, satisfying);
    }

    // Types listing some operations but not all of them were rejected above
    let contract_name = contract.short_name();
    let conventional = candidates(types, &contract, |known| {
        known.operations().is_empty() && follows_convention(contract_name, known.key().short_name())
    });
    debug!(
        contract = contract.name,
        count = conventional.len(),
        "No implementations found, naming conventions used"
    );
    best(&contract, conventional)
}

fn candidates<'a>(
    types: &'a [KnownType],
    contract: &ServiceKey,
    filter: impl Fn(&KnownType) -> bool,
) -> Vec<(&'a KnownType, &'a Conversion)> {
    types
        .iter()
        .filter_map(|known| {
            let conversion = known.conversion(contract)?;
            filter(known).then_some((known, conversion))
        })
        .collect()
}

fn best<'a>(contract: &ServiceKey, candidates: Vec<(&'a KnownType, &'a Conversion)>) -> Option<&'a Conversion> {
    let mut best: Option<(Score, &KnownType, &Conversion)> = None;
    for (known, conversion) in candidates {
        let score = Score::new(contract, &known.key());
        debug!(candidate = known.key().name, ?score, "Candidate scored");
        if best.as_ref().map_or(true, |(best_score, ..)| score > *best_score) {
            best = Some((score, known, conversion));
        }
    }

    let (_, known, conversion) = best?;
    debug!(contract = contract.name, implementation = known.key().name, "Implementation discovered");
    Some(conversion)
}
