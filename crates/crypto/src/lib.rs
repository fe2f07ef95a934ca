//! Key custody primitives for splitvault
//!
//! This crate provides:
//! - PBKDF2 passcode key derivation ([`kdf`])
//! - Authenticated (and legacy stream) encryption of the server share ([`cipher`])
//! - Three-way XOR splitting of a 64-byte root secret ([`shares`])
//! - Deterministic per-chain keypairs from the root secret ([`derive`]):
//!   SLIP-10 ed25519 for Solana, tag-hashed secp256k1 for EVM networks
//! - Passcode-gated reconstruction of an ephemeral signing keypair ([`custody`])
//! - Zeroizing containers for all transient secret material ([`secure`])
//!
//! The root secret is never persisted. A wallet's durable state is a
//! [`ShareRecord`] plus the public [`ChainWallet`](splitvault_types::ChainWallet)
//! entries; every signature re-runs reconstruction and derivation and drops
//! the secret material as soon as the signature is produced.

pub mod cipher;
pub mod custody;
pub mod derive;
pub mod ed25519;
pub mod error;
pub mod kdf;
pub mod secp256k1;
pub mod secure;
pub mod shares;

// Errors
pub use error::{CustodyError, CustodyResult};

// Passcode derivation and share cipher
pub use cipher::ShareCipherKind;
pub use kdf::{KdfParams, DEFAULT_ITERATIONS, MIN_ITERATIONS};

// Secret sharing
pub use shares::{CreatedShares, SecretSharingEngine, ShareRecord, ROOT_SECRET_LENGTH};

// Chain derivation
pub use derive::{
    derive_ed25519, derive_for_chain, derive_secp256k1, derive_verified, ChainKeypair,
    ChainSignature, SOLANA_DERIVATION_PATH,
};
pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519SecretKey, Ed25519Signature};
pub use secp256k1::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1SecretKey, Secp256k1Signature};

// Reconstruction
pub use custody::{setup_wallet, SigningKeypairReconstructor, SigningRequest, WalletSetup};

// Secure memory
pub use secure::{ExposeSecret, Passcode, RootSecret, SecretBytes, SecretString};
