//! Protocol-versioned fee calculation.
//!
//! The ledger advertises which formula version is in force through its
//! protocol state. A [`FeeFormulaRegistry`] maps each version to a strategy
//! object; adding a version means registering a new formula, call sites do
//! not change.

use ledgerdesk_types::SignatureScheme;
use std::collections::BTreeMap;

use crate::error::ChainError;
use crate::microblock::Microblock;

pub trait FeeFormula: Send + Sync {
    fn version(&self) -> u32;

    /// Gas for `microblock` once signed with `scheme`.
    fn compute_fees(&self, scheme: SignatureScheme, microblock: &Microblock) -> Result<u64, ChainError>;
}

/// Version 1: a fixed base, a charge per section and a charge per byte of
/// sections and signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearFeeFormula {
    pub base: u64,
    pub per_section: u64,
    pub per_byte: u64,
}

impl Default for LinearFeeFormula {
    fn default() -> Self {
        Self {
            base: 1_000,
            per_section: 100,
            per_byte: 10,
        }
    }
}

impl FeeFormula for LinearFeeFormula {
    fn version(&self) -> u32 {
        1
    }

    fn compute_fees(&self, scheme: SignatureScheme, microblock: &Microblock) -> Result<u64, ChainError> {
        let sections = microblock.sections().len() as u64;
        let bytes = (microblock.sections_size()? + scheme.signature_size()) as u64;
        Ok(self
            .base
            .saturating_add(self.per_section.saturating_mul(sections))
            .saturating_add(self.per_byte.saturating_mul(bytes)))
    }
}

/// Version 2: payload billed in whole pages, signatures billed separately
/// so large post-quantum signatures carry their own weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PagedFeeFormula {
    pub base: u64,
    pub page_size: usize,
    pub per_page: u64,
    pub per_signature_byte: u64,
}

impl Default for PagedFeeFormula {
    fn default() -> Self {
        Self {
            base: 500,
            page_size: 256,
            per_page: 2_000,
            per_signature_byte: 5,
        }
    }
}

impl FeeFormula for PagedFeeFormula {
    fn version(&self) -> u32 {
        2
    }

    fn compute_fees(&self, scheme: SignatureScheme, microblock: &Microblock) -> Result<u64, ChainError> {
        let page_size = self.page_size.max(1);
        let pages = microblock.sections_size()?.div_ceil(page_size) as u64;
        let signature = scheme.signature_size() as u64;
        Ok(self
            .base
            .saturating_add(self.per_page.saturating_mul(pages))
            .saturating_add(self.per_signature_byte.saturating_mul(signature)))
    }
}

pub struct FeeFormulaRegistry {
    formulas: BTreeMap<u32, Box<dyn FeeFormula>>,
}

impl FeeFormulaRegistry {
    pub fn empty() -> Self {
        Self {
            formulas: BTreeMap::new(),
        }
    }

    /// Register a formula under its own version, replacing any previous one.
    pub fn register(&mut self, formula: Box<dyn FeeFormula>) {
        self.formulas.insert(formula.version(), formula);
    }

    pub fn get(&self, version: u32) -> Result<&dyn FeeFormula, ChainError> {
        self.formulas
            .get(&version)
            .map(|f| f.as_ref())
            .ok_or(ChainError::UnknownFeeFormula(version))
    }

    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.formulas.keys().copied()
    }

    /// Resolve the formula for `version` and price `microblock`.
    pub fn compute_fees(
        &self,
        version: u32,
        scheme: SignatureScheme,
        microblock: &Microblock,
    ) -> Result<u64, ChainError> {
        self.get(version)?.compute_fees(scheme, microblock)
    }
}

impl Default for FeeFormulaRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(LinearFeeFormula::default()));
        registry.register(Box::new(PagedFeeFormula::default()));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::microblock::VirtualBlockchainKind;
    use crate::section::Section;
    use ledgerdesk_types::Hash;

    fn stake_block() -> Microblock {
        let mut mb = Microblock::continuation(VirtualBlockchainKind::Account, Hash::new([1; 32]), 3);
        mb.add_section(Section::AccountStake {
            validator_node_id: Hash::new([2; 32]),
            amount: 1_000,
        });
        mb
    }

    #[test]
    fn default_registry_knows_both_versions() {
        let registry = FeeFormulaRegistry::default();
        assert_eq!(registry.versions().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn unknown_version_is_an_error() {
        let registry = FeeFormulaRegistry::default();
        assert!(matches!(
            registry.compute_fees(9, SignatureScheme::Secp256k1, &stake_block()),
            Err(ChainError::UnknownFeeFormula(9))
        ));
    }

    #[test]
    fn linear_formula_adds_components() {
        let mb = stake_block();
        let size = mb.sections_size().unwrap() as u64;
        let fees = LinearFeeFormula::default()
            .compute_fees(SignatureScheme::Ed25519, &mb)
            .unwrap();
        assert_eq!(fees, 1_000 + 100 + 10 * (size + 64));
    }

    #[test]
    fn fees_depend_on_scheme() {
        let registry = FeeFormulaRegistry::default();
        let mb = stake_block();
        for version in [1, 2] {
            let classic = registry
                .compute_fees(version, SignatureScheme::Secp256k1, &mb)
                .unwrap();
            let post_quantum = registry
                .compute_fees(version, SignatureScheme::MlDsa65, &mb)
                .unwrap();
            assert!(post_quantum > classic, "version {version}");
        }
    }

    #[test]
    fn more_sections_cost_more() {
        let registry = FeeFormulaRegistry::default();
        let one = stake_block();
        let mut two = stake_block();
        two.add_section(Section::AccountUnstake {
            validator_node_id: Hash::new([3; 32]),
            amount: 10,
        });
        let a = registry.compute_fees(1, SignatureScheme::Secp256k1, &one).unwrap();
        let b = registry.compute_fees(1, SignatureScheme::Secp256k1, &two).unwrap();
        assert!(b > a);
    }

    #[test]
    fn registering_replaces_same_version() {
        let mut registry = FeeFormulaRegistry::default();
        registry.register(Box::new(LinearFeeFormula {
            base: 0,
            per_section: 0,
            per_byte: 0,
        }));
        let fees = registry
            .compute_fees(1, SignatureScheme::Secp256k1, &stake_block())
            .unwrap();
        assert_eq!(fees, 0);
    }
}
