use proptest::prelude::*;

use ledgerdesk_chain::{FeeFormulaRegistry, Microblock, Section, VirtualBlockchainKind};
use ledgerdesk_crypto::{derive_keypair, verify_signature};
use ledgerdesk_types::{AccountId, Hash, SignatureScheme};

fn stake(amount: u64) -> Section {
    Section::AccountStake {
        validator_node_id: Hash::new([4; 32]),
        amount,
    }
}

proptest! {
    /// Adding a section never lowers the fee under any registered formula.
    #[test]
    fn fees_monotonic_in_sections(amounts in prop::collection::vec(any::<u64>(), 1..8)) {
        let registry = FeeFormulaRegistry::default();
        let mut mb = Microblock::continuation(VirtualBlockchainKind::Account, Hash::new([1; 32]), 1);
        let mut previous = [0u64; 2];
        for amount in amounts {
            mb.add_section(stake(amount));
            for (slot, version) in [1u32, 2].into_iter().enumerate() {
                let fees = registry.compute_fees(version, SignatureScheme::Secp256k1, &mb).unwrap();
                prop_assert!(fees >= previous[slot]);
                previous[slot] = fees;
            }
        }
    }

    /// Every sealed microblock carries a signature that verifies over its body.
    #[test]
    fn sealed_blocks_verify(seed in prop::array::uniform32(0u8..), amount in any::<u64>(), gas in any::<u64>()) {
        let keys = derive_keypair(&hex::encode(seed), SignatureScheme::Ed25519).unwrap();
        let mut mb = Microblock::genesis(VirtualBlockchainKind::Account);
        mb.add_section(stake(amount));
        mb.set_gas(gas);
        let sealed = mb.seal(&keys.private, AccountId::new([8; 32])).unwrap();
        let body = sealed.signed_bytes().unwrap();
        prop_assert!(verify_signature(&body, sealed.signature(), &keys.public));
    }
}
