use proptest::prelude::*;

use ledgerdesk_types::{next_id, Hash};

proptest! {
    /// Hex encoding parses back to the same hash.
    #[test]
    fn hash_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = Hash::new(bytes);
        prop_assert_eq!(Hash::from_hex(&hash.encode()).unwrap(), hash);
    }

    /// Case and surrounding whitespace never change the parsed identifier.
    #[test]
    fn hash_parse_case_and_whitespace_insensitive(
        bytes in prop::array::uniform32(0u8..),
        left in "[ \t\n]{0,3}",
        right in "[ \t\n]{0,3}",
    ) {
        let hash = Hash::new(bytes);
        let noisy = format!("{left}{}{right}", hash.encode().to_uppercase());
        prop_assert_eq!(Hash::from_hex(&noisy).unwrap(), hash);
    }

    /// Hash::is_zero is true only for all-zero bytes.
    #[test]
    fn hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(Hash::new(bytes).is_zero(), bytes == [0u8; 32]);
    }

    /// The next id is strictly greater than every existing id.
    #[test]
    fn next_id_exceeds_existing(
        ids in prop::collection::vec(1u64..10_000, 0..50),
        high_water in 0u64..10_000,
    ) {
        let next = next_id(ids.iter().copied(), high_water);
        prop_assert!(ids.iter().all(|id| *id < next));
        prop_assert!(high_water < next);
    }
}
