//! One-time code properties

use proptest::prelude::*;
use splitvault_links::OneTimeCodeCodec;
use splitvault_types::{Amount, LinkId, TimestampMillis};

fn codec() -> OneTimeCodeCodec {
    OneTimeCodeCodec::new(b"splitvault-test-deployment-secret".to_vec()).unwrap()
}

#[test]
fn test_reference_link_example() {
    let codec = codec();
    let id = LinkId::new("pl_ab12cd34").unwrap();
    let amount = Amount::new("10.50").unwrap();
    let other_amount = Amount::new("10.51").unwrap();
    let created_at = TimestampMillis::new(1_700_000_000_000);

    let first = codec.generate(&id, &amount, created_at).unwrap();
    let second = codec.generate(&id, &amount, created_at).unwrap();
    assert_eq!(first.code, second.code);
    assert_eq!(first.verification_data, second.verification_data);

    assert!(codec.verify(&first.code, &id, &amount, created_at, &first.verification_data));
    assert!(!codec.verify(
        &first.code,
        &id,
        &other_amount,
        created_at,
        &first.verification_data
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip(
        id in "[a-z0-9_]{1,24}",
        whole in 0u32..1_000_000,
        cents in 0u32..100,
        created_at in 0i64..4_000_000_000_000,
    ) {
        let codec = codec();
        let id = LinkId::new(id).unwrap();
        let amount = Amount::new(format!("{whole}.{cents:02}")).unwrap();
        let created_at = TimestampMillis::new(created_at);

        let generated = codec.generate(&id, &amount, created_at).unwrap();
        prop_assert_eq!(generated.code.len(), 6);
        prop_assert!(generated.code.bytes().all(|b| b.is_ascii_digit()));
        prop_assert!(codec.verify(&generated.code, &id, &amount, created_at, &generated.verification_data));
    }

    #[test]
    fn prop_bound_to_created_at(
        id in "[a-z0-9_]{1,24}",
        created_at in 0i64..4_000_000_000_000,
        shift in 1i64..1_000_000,
    ) {
        let codec = codec();
        let id = LinkId::new(id).unwrap();
        let amount = Amount::new("25.00").unwrap();
        let created_at = TimestampMillis::new(created_at);
        let moved = TimestampMillis::new(created_at.as_millis() + shift);

        let generated = codec.generate(&id, &amount, created_at).unwrap();
        let regenerated = codec.generate(&id, &amount, moved).unwrap();
        // Codes may collide in the 10^6 space; the digest must not
        prop_assert_ne!(&generated.verification_data, &regenerated.verification_data);
        if generated.code != regenerated.code {
            prop_assert!(!codec.verify(&generated.code, &id, &amount, moved, &generated.verification_data));
        }
    }
}
