use proptest::prelude::*;

use ledgerdesk_crypto::{derive_keypair, sign_message, verify_signature};
use ledgerdesk_types::SignatureScheme;

fn scheme() -> impl Strategy<Value = SignatureScheme> {
    prop_oneof![
        Just(SignatureScheme::Secp256k1),
        Just(SignatureScheme::Ed25519),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Derivation is a pure function of (seed, scheme).
    #[test]
    fn derivation_is_deterministic(seed in prop::collection::vec(any::<u8>(), 32..=64), scheme in scheme()) {
        let encoded = hex::encode(&seed);
        let a = derive_keypair(&encoded, scheme).unwrap();
        let b = derive_keypair(&encoded.to_uppercase(), scheme).unwrap();
        prop_assert_eq!(&a.public, &b.public);
        prop_assert_eq!(a.private.secret_bytes(), b.private.secret_bytes());
    }

    /// Every derived key signs messages its public key verifies.
    #[test]
    fn derived_keys_sign_and_verify(seed in prop::array::uniform32(any::<u8>()), msg in prop::collection::vec(any::<u8>(), 0..256), scheme in scheme()) {
        let kp = derive_keypair(&hex::encode(seed), scheme).unwrap();
        let sig = sign_message(&msg, &kp.private).unwrap();
        prop_assert!(verify_signature(&msg, &sig, &kp.public));
    }
}
