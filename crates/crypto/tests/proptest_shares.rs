//! Property-based tests for share splitting and chain derivation
//!
//! PBKDF2 dominates the runtime, so case counts are kept low and the KDF
//! runs at the minimum iteration count.

use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use splitvault_crypto::{
    derive_for_chain, derive_secp256k1, derive_verified, ExposeSecret, KdfParams, Passcode,
    RootSecret, SecretSharingEngine, ShareCipherKind, MIN_ITERATIONS,
};
use splitvault_types::Chain;

fn engine(cipher: ShareCipherKind) -> SecretSharingEngine {
    SecretSharingEngine::new(KdfParams::new(MIN_ITERATIONS)).with_cipher(cipher)
}

fn passcode_strategy() -> impl Strategy<Value = String> {
    "[0-9]{6}"
}

fn cipher_strategy() -> impl Strategy<Value = ShareCipherKind> {
    prop_oneof![
        Just(ShareCipherKind::Aes256Gcm),
        Just(ShareCipherKind::LegacyXorStream)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: passcode_share ^ server_share ^ backup_share == root
    #[test]
    fn prop_share_invariant(pin in passcode_strategy(), cipher in cipher_strategy(), seed in any::<u64>()) {
        let engine = engine(cipher);
        let pin = Passcode::new(&pin).unwrap();
        let created = engine
            .create_with_rng(&pin, &mut StdRng::seed_from_u64(seed))
            .unwrap();
        let record = &created.record;

        let (passcode_share, key) = record
            .kdf_params()
            .derive_share_material(&pin, &record.salt)
            .unwrap();
        let server_share = record
            .cipher
            .decrypt(&record.server_share_encrypted, key.expose_secret())
            .unwrap();

        let combined: Vec<u8> = passcode_share
            .expose_secret()
            .iter()
            .zip(server_share.expose_secret().iter())
            .zip(record.backup_share.iter())
            .map(|((p, s), b)| p ^ s ^ b)
            .collect();
        prop_assert_eq!(combined.as_slice(), created.root_secret.expose_secret().as_slice());
    }

    /// Property: reconstruct(correct passcode) == root
    #[test]
    fn prop_reconstruction_correct(pin in passcode_strategy(), cipher in cipher_strategy()) {
        let engine = engine(cipher);
        let pin = Passcode::new(&pin).unwrap();
        let created = engine.create(&pin).unwrap();
        let root = engine.reconstruct(&pin, &created.record).unwrap();
        prop_assert!(root.ct_eq(&created.root_secret));
    }

    /// Property: a wrong passcode on the legacy cipher returns 64 bytes,
    /// never an error, and the derived address does not match
    #[test]
    fn prop_wrong_passcode_is_silent_until_address_check(
        pin in passcode_strategy(),
        other in passcode_strategy(),
    ) {
        prop_assume!(pin != other);
        let engine = engine(ShareCipherKind::LegacyXorStream);
        let right = Passcode::new(&pin).unwrap();
        let wrong = Passcode::new(&other).unwrap();

        let created = engine.create(&right).unwrap();
        let wallet = derive_for_chain(&created.root_secret, Chain::Solana).unwrap().wallet();

        let root = engine.reconstruct(&wrong, &created.record).unwrap();
        prop_assert_eq!(root.expose_secret().len(), 64);
        prop_assert!(derive_verified(&root, &wallet).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: derivation is a pure function of the root (and tag)
    #[test]
    fn prop_derivation_determinism(bytes in any::<[u8; 32]>(), tag in "[a-z]{1,12}") {
        let mut root = [0u8; 64];
        root[..32].copy_from_slice(&bytes);
        root[32..].copy_from_slice(&bytes);

        let a = RootSecret::from_bytes(root);
        let b = RootSecret::from_bytes(root);
        for chain in Chain::ALL {
            prop_assert_eq!(
                derive_for_chain(&a, chain).unwrap().wallet(),
                derive_for_chain(&b, chain).unwrap().wallet()
            );
        }
        prop_assert_eq!(
            derive_secp256k1(&a, &tag).unwrap().address(),
            derive_secp256k1(&b, &tag).unwrap().address()
        );
    }

    /// Property: distinct tags give distinct secp256k1 keys
    #[test]
    fn prop_chain_isolation(bytes in any::<[u8; 32]>(), a in "[a-z]{1,12}", b in "[a-z]{1,12}") {
        prop_assume!(a != b);
        let mut root = [0u8; 64];
        root[..32].copy_from_slice(&bytes);
        let root = RootSecret::from_bytes(root);
        prop_assert_ne!(
            derive_secp256k1(&root, &a).unwrap().address(),
            derive_secp256k1(&root, &b).unwrap().address()
        );
    }
}
