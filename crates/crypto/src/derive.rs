//! Deterministic per-chain key derivation from the root secret
//!
//! - ed25519: SLIP-10 over the 64-byte root as seed, hardened path
//!   [`SOLANA_DERIVATION_PATH`]
//! - secp256k1: `SHA-256(root || tag)` taken directly as the private scalar
//!
//! Both are pure. The address computed at wallet creation is re-derived
//! bit-for-bit at every signing, which is what lets [`derive_verified`]
//! serve as the passcode-correctness oracle.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use splitvault_types::{Chain, ChainWallet, CurveFamily};
use zeroize::Zeroize;

use crate::ed25519::{Ed25519KeyPair, Ed25519SecretKey, Ed25519Signature};
use crate::error::{CustodyError, CustodyResult};
use crate::secp256k1::{Secp256k1KeyPair, Secp256k1SecretKey, Secp256k1Signature};
use crate::secure::{RootSecret, SecretArray};

/// BIP-44 path for the ed25519 ledger (coin type 501)
pub const SOLANA_DERIVATION_PATH: &str = "m/44'/501'/0'/0'";

/// Hardened index offset
const HARDENED_OFFSET: u32 = 0x8000_0000;

/// SLIP-10 master key domain for ed25519
const ED25519_CURVE_SEED: &[u8] = b"ed25519 seed";

type HmacSha512 = Hmac<Sha512>;

/// Parse `m/a'/b'/...` into hardened indices.
///
/// SLIP-10 ed25519 has no public derivation, so every component must carry
/// a `'` or `h` suffix.
pub fn parse_hardened_path(path: &str) -> CustodyResult<Vec<u32>> {
    let path = path.trim();
    let rest = match path {
        "m" => return Ok(Vec::new()),
        p => p
            .strip_prefix("m/")
            .ok_or_else(|| CustodyError::InvalidPath(format!("{p}: must start with m/")))?,
    };

    rest.split('/')
        .map(|part| {
            let digits = part
                .strip_suffix('\'')
                .or_else(|| part.strip_suffix('h'))
                .ok_or_else(|| {
                    CustodyError::InvalidPath(format!("{part}: component must be hardened"))
                })?;
            let index: u32 = digits
                .parse()
                .map_err(|_| CustodyError::InvalidPath(format!("{part}: not a number")))?;
            if index >= HARDENED_OFFSET {
                return Err(CustodyError::InvalidPath(format!("{part}: index too large")));
            }
            Ok(index | HARDENED_OFFSET)
        })
        .collect()
}

/// SLIP-10 ed25519 private key for `seed` at `path`.
pub fn slip10_ed25519(seed: &[u8], path: &str) -> CustodyResult<SecretArray<32>> {
    let indices = parse_hardened_path(path)?;

    let mut mac = HmacSha512::new_from_slice(ED25519_CURVE_SEED)
        .map_err(|e| CustodyError::InvalidPath(e.to_string()))?;
    mac.update(seed);
    let i = mac.finalize().into_bytes();

    let mut key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    key.copy_from_slice(&i[..32]);
    chain_code.copy_from_slice(&i[32..]);

    for index in indices {
        let mut mac = HmacSha512::new_from_slice(&chain_code)
            .map_err(|e| CustodyError::InvalidPath(e.to_string()))?;
        mac.update(&[0x00]);
        mac.update(&key);
        mac.update(&index.to_be_bytes());
        let i = mac.finalize().into_bytes();

        key.copy_from_slice(&i[..32]);
        chain_code.copy_from_slice(&i[32..]);
    }

    let out = SecretArray::new(key);
    key.zeroize();
    chain_code.zeroize();
    Ok(out)
}

/// Derive the ed25519 keypair at [`SOLANA_DERIVATION_PATH`].
pub fn derive_ed25519(root: &RootSecret) -> CustodyResult<Ed25519KeyPair> {
    let key = slip10_ed25519(root.expose_secret(), SOLANA_DERIVATION_PATH)?;
    let secret = Ed25519SecretKey::from_seed(key.expose_secret());
    Ok(Ed25519KeyPair::from_secret_key(secret))
}

/// Derive a secp256k1 keypair as `SHA-256(root || tag)`.
///
/// Distinct tags give unrelated keys. Wallets always use
/// [`Chain::derivation_tag`], so every EVM network shares one key.
pub fn derive_secp256k1(root: &RootSecret, tag: &str) -> CustodyResult<Secp256k1KeyPair> {
    let mut hasher = Sha256::new();
    hasher.update(root.expose_secret());
    hasher.update(tag.as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();

    let secret = Secp256k1SecretKey::from_bytes(&digest);
    digest.zeroize();
    Ok(Secp256k1KeyPair::from_secret_key(secret?))
}

/// Derive the keypair `chain` signs with.
pub fn derive_for_chain(root: &RootSecret, chain: Chain) -> CustodyResult<ChainKeypair> {
    let keypair = match chain.derivation_tag() {
        None => ChainKeypair::Ed25519 {
            chain,
            keypair: derive_ed25519(root)?,
        },
        Some(tag) => ChainKeypair::Secp256k1 {
            chain,
            keypair: derive_secp256k1(root, tag)?,
        },
    };
    tracing::trace!(chain = %chain, "derived chain keypair");
    Ok(keypair)
}

/// Derive for `wallet.chain` and require the address to match `wallet`.
///
/// This is the only check that a reconstructed root secret is the right
/// one. A mismatch is reported as [`CustodyError::InvalidPasscode`] since a
/// wrong passcode and a corrupted fragment are indistinguishable here.
pub fn derive_verified(root: &RootSecret, wallet: &ChainWallet) -> CustodyResult<ChainKeypair> {
    let candidate = derive_for_chain(root, wallet.chain)?;
    if !wallet.matches_address(&candidate.address()) {
        tracing::debug!(chain = %wallet.chain, "derived address does not match stored wallet");
        return Err(CustodyError::InvalidPasscode);
    }
    Ok(candidate)
}

/// An ephemeral chain-specific signing keypair
///
/// Never persisted and never cloned. Drop it as soon as the signature it was
/// reconstructed for has been produced.
#[derive(Debug)]
pub enum ChainKeypair {
    /// SLIP-10 ed25519 keypair
    Ed25519 {
        /// Chain this key signs for
        chain: Chain,
        /// Keypair
        keypair: Ed25519KeyPair,
    },
    /// Tag-derived secp256k1 keypair
    Secp256k1 {
        /// Chain this key signs for
        chain: Chain,
        /// Keypair
        keypair: Secp256k1KeyPair,
    },
}

impl ChainKeypair {
    /// Chain this keypair belongs to
    pub fn chain(&self) -> Chain {
        match self {
            ChainKeypair::Ed25519 { chain, .. } | ChainKeypair::Secp256k1 { chain, .. } => *chain,
        }
    }

    /// Curve family
    pub fn family(&self) -> CurveFamily {
        self.chain().family()
    }

    /// Ledger-native address
    pub fn address(&self) -> String {
        match self {
            ChainKeypair::Ed25519 { keypair, .. } => keypair.address(),
            ChainKeypair::Secp256k1 { keypair, .. } => keypair.address(),
        }
    }

    /// Hex public key (32 bytes ed25519, 33 bytes compressed secp256k1)
    pub fn public_key_hex(&self) -> String {
        match self {
            ChainKeypair::Ed25519 { keypair, .. } => hex::encode(keypair.public_key.to_bytes()),
            ChainKeypair::Secp256k1 { keypair, .. } => {
                hex::encode(keypair.public_key.to_bytes())
            }
        }
    }

    /// Persistable public half
    pub fn wallet(&self) -> ChainWallet {
        ChainWallet {
            chain: self.chain(),
            address: self.address(),
            public_key: self.public_key_hex(),
        }
    }

    /// Sign `msg` with the chain's scheme
    pub fn sign(&self, msg: &[u8]) -> CustodyResult<ChainSignature> {
        match self {
            ChainKeypair::Ed25519 { keypair, .. } => Ok(ChainSignature::Ed25519(keypair.sign(msg))),
            ChainKeypair::Secp256k1 { keypair, .. } => {
                Ok(ChainSignature::Secp256k1(keypair.sign(msg)?))
            }
        }
    }

    /// Verify a signature produced by [`ChainKeypair::sign`]
    pub fn verify(&self, msg: &[u8], sig: &ChainSignature) -> bool {
        match (self, sig) {
            (ChainKeypair::Ed25519 { keypair, .. }, ChainSignature::Ed25519(sig)) => {
                keypair.public_key.verify(msg, sig)
            }
            (ChainKeypair::Secp256k1 { keypair, .. }, ChainSignature::Secp256k1(sig)) => {
                keypair.public_key.verify(msg, sig)
            }
            _ => false,
        }
    }
}

/// Signature over a message, tagged by curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainSignature {
    /// 64-byte ed25519 signature
    Ed25519(Ed25519Signature),
    /// 64-byte `r || s` ECDSA signature over keccak256(message)
    Secp256k1(Secp256k1Signature),
}

impl ChainSignature {
    /// Raw 64 signature bytes
    pub fn to_bytes(&self) -> [u8; 64] {
        match self {
            ChainSignature::Ed25519(sig) => sig.to_bytes(),
            ChainSignature::Secp256k1(sig) => sig.to_bytes(),
        }
    }

    /// Ledger-conventional text: base58 for ed25519, `0x` hex for secp256k1
    pub fn encode(&self) -> String {
        match self {
            ChainSignature::Ed25519(sig) => bs58::encode(sig.to_bytes()).into_string(),
            ChainSignature::Secp256k1(sig) => format!("0x{}", hex::encode(sig.to_bytes())),
        }
    }
}
