//! Secp256k1 keys for EVM-compatible networks
//!
//! Addresses are the last 20 bytes of keccak256 over the uncompressed public
//! key without its `0x04` tag, rendered EIP-55 checksummed. Messages are
//! signed as ECDSA over keccak256(message).
//!
//! Secret scalars come from tag derivation (see [`crate::derive`]) and must
//! be non-zero and below the curve order.

use crate::error::CustodyError;
use alloy_primitives::{keccak256, Address};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};

/// Secp256k1 signing scalar
pub struct Secp256k1SecretKey(SigningKey);

impl Secp256k1SecretKey {
    /// Parse a big-endian 32-byte scalar
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CustodyError> {
        SigningKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CustodyError::InvalidSecretKey)
    }

    /// Matching public key
    pub fn public_key(&self) -> Secp256k1PublicKey {
        Secp256k1PublicKey(*self.0.verifying_key())
    }

    /// ECDSA over keccak256(msg), low-s normalised
    pub fn sign(&self, msg: &[u8]) -> Result<Secp256k1Signature, CustodyError> {
        let digest = keccak256(msg);
        let sig: Signature = self
            .0
            .sign_prehash(digest.as_slice())
            .map_err(|_| CustodyError::InvalidSignature)?;
        Ok(Secp256k1Signature(sig.normalize_s().unwrap_or(sig)))
    }
}

impl std::fmt::Debug for Secp256k1SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secp256k1SecretKey([REDACTED])")
    }
}

/// Secp256k1 verifying key
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Secp256k1PublicKey(VerifyingKey);

impl Secp256k1PublicKey {
    /// Parse a SEC1 point, compressed (33 bytes) or uncompressed (65 bytes)
    pub fn from_sec1(bytes: &[u8]) -> Result<Self, CustodyError> {
        VerifyingKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CustodyError::InvalidPublicKey)
    }

    /// Compressed SEC1 encoding, as stored in wallets
    pub fn to_bytes(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out.copy_from_slice(self.0.to_encoded_point(true).as_bytes());
        out
    }

    /// Uncompressed SEC1 encoding including the `0x04` tag
    pub fn to_uncompressed_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out.copy_from_slice(self.0.to_encoded_point(false).as_bytes());
        out
    }

    /// 20-byte EVM address
    pub fn evm_address(&self) -> Address {
        let point = self.to_uncompressed_bytes();
        Address::from_slice(&keccak256(&point[1..])[12..])
    }

    /// EIP-55 checksummed address string
    pub fn checksum_address(&self) -> String {
        self.evm_address().to_checksum(None)
    }

    /// Check a signature over keccak256(msg)
    pub fn verify(&self, msg: &[u8], sig: &Secp256k1Signature) -> bool {
        self.0
            .verify_prehash(keccak256(msg).as_slice(), &sig.0)
            .is_ok()
    }
}

impl std::fmt::Debug for Secp256k1PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secp256k1PublicKey({})", self.checksum_address())
    }
}

/// Fixed-width `r || s` ECDSA signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Secp256k1Signature(Signature);

impl Secp256k1Signature {
    /// Parse `r || s`
    pub fn from_bytes(bytes: &[u8; 64]) -> Result<Self, CustodyError> {
        Signature::from_slice(bytes)
            .map(Self)
            .map_err(|_| CustodyError::InvalidSignature)
    }

    /// `r || s`
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes().into()
    }
}

/// A tag-derived EVM key
pub struct Secp256k1KeyPair {
    pub secret_key: Secp256k1SecretKey,
    pub public_key: Secp256k1PublicKey,
}

impl Secp256k1KeyPair {
    /// Pair a scalar with its public key
    pub fn from_secret_key(secret_key: Secp256k1SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self {
            secret_key,
            public_key,
        }
    }

    /// Sign `msg`
    pub fn sign(&self, msg: &[u8]) -> Result<Secp256k1Signature, CustodyError> {
        self.secret_key.sign(msg)
    }

    /// Checksummed `0x` address
    pub fn address(&self) -> String {
        self.public_key.checksum_address()
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(byte: u8) -> Secp256k1KeyPair {
        Secp256k1KeyPair::from_secret_key(Secp256k1SecretKey::from_bytes(&[byte; 32]).unwrap())
    }

    fn scalar_one() -> Secp256k1KeyPair {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        Secp256k1KeyPair::from_secret_key(Secp256k1SecretKey::from_bytes(&bytes).unwrap())
    }

    #[test]
    fn test_scalar_one_address() {
        assert_eq!(
            scalar_one().address(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn test_out_of_range_scalars() {
        for bad in [[0u8; 32], [0xFF; 32]] {
            assert!(matches!(
                Secp256k1SecretKey::from_bytes(&bad),
                Err(CustodyError::InvalidSecretKey)
            ));
        }
    }

    #[test]
    fn test_signature_checks_message_and_key() {
        let signer = scalar(0x42);
        let sig = signer.sign(b"approve 10.50").unwrap();
        assert!(signer.public_key.verify(b"approve 10.50", &sig));
        assert!(!signer.public_key.verify(b"approve 10.51", &sig));
        assert!(!scalar_one().public_key.verify(b"approve 10.50", &sig));

        let parsed = Secp256k1Signature::from_bytes(&sig.to_bytes()).unwrap();
        assert!(signer.public_key.verify(b"approve 10.50", &parsed));
    }

    #[test]
    fn test_sec1_encodings_agree() {
        let key = scalar(0x33).public_key;
        let uncompressed = key.to_uncompressed_bytes();
        assert_eq!(uncompressed[0], 0x04);
        assert_eq!(Secp256k1PublicKey::from_sec1(&uncompressed).unwrap(), key);
        assert_eq!(Secp256k1PublicKey::from_sec1(&key.to_bytes()).unwrap(), key);
        assert!(Secp256k1PublicKey::from_sec1(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_debug_shows_no_scalar() {
        let pair = scalar(0x66);
        let debug = format!("{:?} {:?}", pair, pair.secret_key);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(&hex::encode([0x66u8; 32])));
    }
}
