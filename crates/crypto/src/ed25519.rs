//! Ed25519 keys for base58-addressed ledgers
//!
//! Solana-style addresses are the base58 encoding of the 32-byte public key.
//! Secret keys are 32-byte seeds produced by SLIP-10 derivation
//! (see [`crate::derive`]); they are never generated or stored on their own.

use crate::error::CustodyError;
use ed25519_consensus::{
    Signature as Ed25519Sig, SigningKey as Ed25519Secret, VerificationKey as Ed25519Pubkey,
};
use zeroize::Zeroize;

/// Ed25519 secret key (32-byte seed)
pub struct Ed25519SecretKey(Ed25519Secret);

impl Ed25519SecretKey {
    /// Create from seed bytes (32 bytes)
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(Ed25519Secret::from(*seed))
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.0.verification_key())
    }

    /// Sign a message
    pub fn sign(&self, msg: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.0.sign(msg))
    }

    /// 64-byte `seed || public key` encoding used by Solana keypair files.
    ///
    /// The caller owns zeroizing the returned buffer.
    pub fn to_keypair_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        let mut seed = self.0.to_bytes();
        out[..32].copy_from_slice(&seed);
        out[32..].copy_from_slice(&self.public_key().to_bytes());
        seed.zeroize();
        out
    }
}

impl std::fmt::Debug for Ed25519SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Ed25519 public key (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519PublicKey(Ed25519Pubkey);

impl Ed25519PublicKey {
    /// Parse a 32-byte point
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CustodyError> {
        Ed25519Pubkey::try_from(*bytes)
            .map(Self)
            .map_err(|_| CustodyError::InvalidPublicKey)
    }

    /// Parse a base58 address back into a public key
    pub fn from_base58(address: &str) -> Result<Self, CustodyError> {
        let bytes = bs58::decode(address)
            .into_vec()
            .map_err(|e| CustodyError::InvalidAddress(e.to_string()))?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CustodyError::InvalidAddress(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Self::from_bytes(&arr)
    }

    /// Raw point bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Ledger address: base58 of the raw public key
    pub fn to_base58(&self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    /// Verify a signature
    pub fn verify(&self, msg: &[u8], sig: &Ed25519Signature) -> bool {
        self.0.verify(&sig.0, msg).is_ok()
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({})", self.to_base58())
    }
}

/// Ed25519 signature (64 bytes)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(Ed25519Sig);

impl Ed25519Signature {
    /// Load from bytes (64 bytes)
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self(Ed25519Sig::from(*bytes))
    }

    /// Serialize to bytes (64 bytes)
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "Ed25519Signature({})", hex::encode(&bytes[..8]))
    }
}

/// Ed25519 key pair
pub struct Ed25519KeyPair {
    pub secret_key: Ed25519SecretKey,
    pub public_key: Ed25519PublicKey,
}

impl Ed25519KeyPair {
    /// Pair a seed with its public key
    pub fn from_secret_key(secret_key: Ed25519SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self {
            secret_key,
            public_key,
        }
    }

    /// Sign a message
    pub fn sign(&self, msg: &[u8]) -> Ed25519Signature {
        self.secret_key.sign(msg)
    }

    /// Base58 address of this key pair
    pub fn address(&self) -> String {
        self.public_key.to_base58()
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &self.public_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(byte: u8) -> Ed25519KeyPair {
        Ed25519KeyPair::from_secret_key(Ed25519SecretKey::from_seed(&[byte; 32]))
    }

    #[test]
    fn test_signature_binds_message_and_key() {
        let signer = keypair(7);
        let sig = signer.sign(b"claim pl_ab12cd34");
        assert!(signer.public_key.verify(b"claim pl_ab12cd34", &sig));
        assert!(!signer.public_key.verify(b"claim pl_ab12cd35", &sig));
        assert!(!keypair(2).public_key.verify(b"claim pl_ab12cd34", &sig));
    }

    #[test]
    fn test_base58_address_roundtrip() {
        let keypair = keypair(9);
        let address = keypair.address();
        assert!((32..=44).contains(&address.len()));
        let restored = Ed25519PublicKey::from_base58(&address).unwrap();
        assert_eq!(restored, keypair.public_key);
    }

    #[test]
    fn test_base58_rejects_garbage() {
        assert!(matches!(
            Ed25519PublicKey::from_base58("0OIl"),
            Err(CustodyError::InvalidAddress(_))
        ));
        assert!(matches!(
            Ed25519PublicKey::from_base58("11111"),
            Err(CustodyError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_keypair_bytes_layout() {
        let keypair = keypair(3);
        let bytes = keypair.secret_key.to_keypair_bytes();
        assert_eq!(&bytes[..32], &[3u8; 32]);
        assert_eq!(&bytes[32..], &keypair.public_key.to_bytes());
    }

    #[test]
    fn test_signature_bytes_roundtrip() {
        let sig = keypair(4).sign(b"test");
        let restored = Ed25519Signature::from_bytes(&sig.to_bytes());
        assert_eq!(sig, restored);
    }

    #[test]
    fn test_secret_debug_redacted() {
        let debug = format!("{:?}", keypair(6).secret_key);
        assert!(debug.contains("[REDACTED]"));
    }
}
