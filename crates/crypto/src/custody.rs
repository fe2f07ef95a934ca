//! Passcode-gated reconstruction of signing keypairs
//!
//! Every signature follows the same path:
//!
//! ```text
//! passcode + ShareRecord ──reconstruct──▶ RootSecret
//!                                           │ derive_verified(wallet)
//!                                           ▼
//!                                      ChainKeypair ──sign──▶ ChainSignature
//! ```
//!
//! The root secret and the keypair live only inside one call. Nothing is
//! cached between calls.

use splitvault_types::{Chain, ChainWallet};
use tracing::{debug, info};

use crate::derive::{derive_for_chain, derive_verified, ChainKeypair, ChainSignature};
use crate::error::{CustodyError, CustodyResult};
use crate::secure::Passcode;
use crate::shares::{SecretSharingEngine, ShareRecord};

/// Inputs for one reconstruction
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    /// User passcode
    pub passcode: &'a Passcode,
    /// Stored fragments
    pub record: &'a ShareRecord,
    /// Stored public wallet for the target chain
    pub wallet: &'a ChainWallet,
}

impl<'a> SigningRequest<'a> {
    /// Build a request
    pub fn new(passcode: &'a Passcode, record: &'a ShareRecord, wallet: &'a ChainWallet) -> Self {
        Self {
            passcode,
            record,
            wallet,
        }
    }
}

/// Orchestrates reconstruction, verification and scoped signing
#[derive(Debug, Clone, Copy, Default)]
pub struct SigningKeypairReconstructor {
    engine: SecretSharingEngine,
}

impl SigningKeypairReconstructor {
    /// Reconstructor backed by `engine`
    pub fn new(engine: SecretSharingEngine) -> Self {
        Self { engine }
    }

    /// The share engine in use
    pub fn engine(&self) -> &SecretSharingEngine {
        &self.engine
    }

    /// Reconstruct and verify the keypair for `request.wallet.chain`.
    ///
    /// Returns [`CustodyError::InvalidPasscode`] when the derived address
    /// does not match the stored one. Prefer [`with_keypair`](Self::with_keypair),
    /// which bounds the keypair's lifetime to a closure.
    pub fn prepare(&self, request: SigningRequest<'_>) -> CustodyResult<ChainKeypair> {
        let root = self.engine.reconstruct(request.passcode, request.record)?;
        let keypair = derive_verified(&root, request.wallet);
        drop(root);
        keypair
    }

    /// Reconstruct, verify, run `f` with the keypair, then drop every secret.
    ///
    /// The keypair is released on all exit paths, including when `f`
    /// returns an error.
    pub fn with_keypair<T, F>(&self, request: SigningRequest<'_>, f: F) -> CustodyResult<T>
    where
        F: FnOnce(&ChainKeypair) -> CustodyResult<T>,
    {
        let keypair = self.prepare(request)?;
        let result = f(&keypair);
        drop(keypair);
        result
    }

    /// Sign `msg` for the request's chain.
    pub fn sign(&self, request: SigningRequest<'_>, msg: &[u8]) -> CustodyResult<ChainSignature> {
        let chain = request.wallet.chain;
        let signature = self.with_keypair(request, |keypair| keypair.sign(msg))?;
        debug!(chain = %chain, len = msg.len(), "signed message");
        Ok(signature)
    }

    /// Derive public wallets for more chains from an already-verified record.
    ///
    /// `request.wallet` anchors the passcode check; every chain in `chains`
    /// is then derived from the same root secret.
    pub fn derive_wallets(
        &self,
        request: SigningRequest<'_>,
        chains: &[Chain],
    ) -> CustodyResult<Vec<ChainWallet>> {
        let root = self.engine.reconstruct(request.passcode, request.record)?;
        derive_verified(&root, request.wallet)?;
        chains
            .iter()
            .map(|chain| derive_for_chain(&root, *chain).map(|kp| kp.wallet()))
            .collect()
    }
}

/// Output of [`setup_wallet`]
#[derive(Debug)]
pub struct WalletSetup {
    /// Fragments to persist
    pub record: ShareRecord,
    /// Backup share as hex; the user's only chance to record it
    pub backup_share_hex: String,
    /// Public wallets, one per requested chain
    pub wallets: Vec<ChainWallet>,
}

impl WalletSetup {
    /// Stored wallet for `chain`
    pub fn wallet(&self, chain: Chain) -> CustodyResult<&ChainWallet> {
        self.wallets
            .iter()
            .find(|w| w.chain == chain)
            .ok_or_else(|| CustodyError::UnsupportedChain(chain.to_string()))
    }
}

/// Create a root secret, split it under `passcode` and derive the public
/// wallets for `chains` (every supported chain if empty).
///
/// The root secret is dropped before this returns.
pub fn setup_wallet(
    engine: &SecretSharingEngine,
    passcode: &Passcode,
    chains: &[Chain],
) -> CustodyResult<WalletSetup> {
    let chains: &[Chain] = if chains.is_empty() { &Chain::ALL } else { chains };

    let created = engine.create(passcode)?;
    let wallets = chains
        .iter()
        .map(|chain| derive_for_chain(&created.root_secret, *chain).map(|kp| kp.wallet()))
        .collect::<CustodyResult<Vec<_>>>()?;
    drop(created.root_secret);

    info!(
        chains = wallets.len(),
        cipher = %created.record.cipher,
        "wallet created"
    );

    Ok(WalletSetup {
        backup_share_hex: created.record.backup_share_hex(),
        record: created.record,
        wallets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::ShareCipherKind;
    use crate::kdf::{KdfParams, MIN_ITERATIONS};

    fn engine() -> SecretSharingEngine {
        SecretSharingEngine::new(KdfParams::new(MIN_ITERATIONS))
    }

    fn passcode(s: &str) -> Passcode {
        Passcode::new(s).unwrap()
    }

    #[test]
    fn test_setup_defaults_to_all_chains() {
        let setup = setup_wallet(&engine(), &passcode("246810"), &[]).unwrap();
        assert_eq!(setup.wallets.len(), Chain::ALL.len());
        assert_eq!(setup.backup_share_hex, setup.record.backup_share_hex());

        let eth = setup.wallet(Chain::Ethereum).unwrap();
        let arb = setup.wallet(Chain::Arbitrum).unwrap();
        assert_eq!(eth.address, arb.address);
        assert!(eth.address.starts_with("0x"));
    }

    #[test]
    fn test_setup_subset() {
        let setup = setup_wallet(&engine(), &passcode("246810"), &[Chain::Solana]).unwrap();
        assert_eq!(setup.wallets.len(), 1);
        assert!(matches!(
            setup.wallet(Chain::Polygon),
            Err(CustodyError::UnsupportedChain(_))
        ));
    }

    #[test]
    fn test_prepare_with_correct_passcode() {
        let engine = engine();
        let pin = passcode("102938");
        let setup = setup_wallet(&engine, &pin, &[Chain::Solana, Chain::Base]).unwrap();
        let reconstructor = SigningKeypairReconstructor::new(engine);

        for wallet in &setup.wallets {
            let keypair = reconstructor
                .prepare(SigningRequest::new(&pin, &setup.record, wallet))
                .unwrap();
            assert_eq!(keypair.wallet(), *wallet);
        }
    }

    #[test]
    fn test_prepare_wrong_passcode_both_ciphers() {
        for cipher in [ShareCipherKind::Aes256Gcm, ShareCipherKind::LegacyXorStream] {
            let engine = engine().with_cipher(cipher);
            let setup = setup_wallet(&engine, &passcode("111000"), &[Chain::Solana]).unwrap();
            let reconstructor = SigningKeypairReconstructor::new(engine);
            let wrong = passcode("111001");

            let err = reconstructor
                .prepare(SigningRequest::new(&wrong, &setup.record, &setup.wallets[0]))
                .unwrap_err();
            assert_eq!(err, CustodyError::InvalidPasscode, "cipher {cipher}");
        }
    }

    #[test]
    fn test_corrupted_backup_looks_like_wrong_passcode() {
        let engine = engine().with_cipher(ShareCipherKind::LegacyXorStream);
        let pin = passcode("565656");
        let mut setup = setup_wallet(&engine, &pin, &[Chain::Ethereum]).unwrap();
        setup.record.backup_share[0] ^= 0x01;

        let err = SigningKeypairReconstructor::new(engine)
            .prepare(SigningRequest::new(&pin, &setup.record, &setup.wallets[0]))
            .unwrap_err();
        assert_eq!(err, CustodyError::InvalidPasscode);
    }

    #[test]
    fn test_with_keypair_propagates_closure_error() {
        let engine = engine();
        let pin = passcode("909090");
        let setup = setup_wallet(&engine, &pin, &[Chain::Solana]).unwrap();
        let reconstructor = SigningKeypairReconstructor::new(engine);

        let result: CustodyResult<()> = reconstructor.with_keypair(
            SigningRequest::new(&pin, &setup.record, &setup.wallets[0]),
            |_| Err(CustodyError::InvalidSignature),
        );
        assert_eq!(result.unwrap_err(), CustodyError::InvalidSignature);
    }

    #[test]
    fn test_sign_verifies_against_stored_wallet() {
        let engine = engine();
        let pin = passcode("717171");
        let setup = setup_wallet(&engine, &pin, &[Chain::Solana, Chain::Ethereum]).unwrap();
        let reconstructor = SigningKeypairReconstructor::new(engine);

        for wallet in &setup.wallets {
            let request = SigningRequest::new(&pin, &setup.record, wallet);
            let sig = reconstructor.sign(request, b"approve").unwrap();
            let ok = reconstructor
                .with_keypair(request, |kp| Ok(kp.verify(b"approve", &sig)))
                .unwrap();
            assert!(ok);
        }
    }

    #[test]
    fn test_derive_wallets_from_anchor() {
        let engine = engine();
        let pin = passcode("828282");
        let setup = setup_wallet(&engine, &pin, &[Chain::Solana]).unwrap();
        let reconstructor = SigningKeypairReconstructor::new(engine);

        let wallets = reconstructor
            .derive_wallets(
                SigningRequest::new(&pin, &setup.record, &setup.wallets[0]),
                &[Chain::Polygon, Chain::Solana],
            )
            .unwrap();
        assert_eq!(wallets[1], setup.wallets[0]);
        assert_eq!(wallets[0].chain, Chain::Polygon);
    }
}
