//! Server-share encryption
//!
//! Two constructions, selected per record by [`ShareCipherKind`]:
//!
//! - `Aes256Gcm`: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//!   Decrypting with the wrong key fails with
//!   [`CustodyError::ShareAuthentication`].
//! - `LegacyXorStream`: plaintext XOR the key repeated to the plaintext
//!   length. No tag, so decryption never fails; a wrong key yields a
//!   well-formed but wrong share and is only caught by the address check.
//!
//! New records always use `Aes256Gcm`. The legacy stream exists so records
//! written by older deployments still reconstruct.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CustodyError, CustodyResult};
use crate::secure::{secret_bytes, SecretBytes};

/// AES-GCM nonce length
pub const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length
pub const TAG_LENGTH: usize = 16;

/// Construction used to encrypt a stored server share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShareCipherKind {
    /// Nonce-prefixed AES-256-GCM
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    /// Repeating-key XOR stream without authentication
    #[serde(rename = "xor-stream")]
    LegacyXorStream,
}

impl ShareCipherKind {
    /// Kind assumed for records that predate the `cipher` field
    pub const fn legacy() -> Self {
        ShareCipherKind::LegacyXorStream
    }

    /// True if decryption detects a wrong key
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, ShareCipherKind::Aes256Gcm)
    }

    /// Encrypt `plaintext` under `key`.
    pub fn encrypt<R: CryptoRng + RngCore>(
        &self,
        plaintext: &[u8],
        key: &[u8],
        rng: &mut R,
    ) -> CustodyResult<Vec<u8>> {
        match self {
            ShareCipherKind::Aes256Gcm => {
                let cipher = Aes256Gcm::new_from_slice(key)
                    .map_err(|e| CustodyError::Cipher(format!("invalid key: {e}")))?;

                let mut nonce_bytes = [0u8; NONCE_LENGTH];
                rng.fill_bytes(&mut nonce_bytes);
                let nonce = Nonce::from_slice(&nonce_bytes);

                let sealed = cipher
                    .encrypt(nonce, plaintext)
                    .map_err(|e| CustodyError::Cipher(format!("encryption failed: {e}")))?;

                let mut out = Vec::with_capacity(NONCE_LENGTH + sealed.len());
                out.extend_from_slice(&nonce_bytes);
                out.extend_from_slice(&sealed);
                Ok(out)
            }
            ShareCipherKind::LegacyXorStream => Ok(xor_stream(plaintext, key)?),
        }
    }

    /// Decrypt `ciphertext` under `key`.
    ///
    /// For `LegacyXorStream` this only fails on an empty key.
    pub fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> CustodyResult<SecretBytes> {
        match self {
            ShareCipherKind::Aes256Gcm => {
                if ciphertext.len() < NONCE_LENGTH + TAG_LENGTH {
                    return Err(CustodyError::Cipher(format!(
                        "ciphertext too short: {} bytes",
                        ciphertext.len()
                    )));
                }
                let cipher = Aes256Gcm::new_from_slice(key)
                    .map_err(|e| CustodyError::Cipher(format!("invalid key: {e}")))?;
                let (nonce, sealed) = ciphertext.split_at(NONCE_LENGTH);

                cipher
                    .decrypt(Nonce::from_slice(nonce), sealed)
                    .map(secret_bytes)
                    .map_err(|_| CustodyError::ShareAuthentication)
            }
            ShareCipherKind::LegacyXorStream => xor_stream(ciphertext, key).map(secret_bytes),
        }
    }

    /// Ciphertext length for a plaintext of `len` bytes
    pub const fn ciphertext_len(&self, len: usize) -> usize {
        match self {
            ShareCipherKind::Aes256Gcm => NONCE_LENGTH + len + TAG_LENGTH,
            ShareCipherKind::LegacyXorStream => len,
        }
    }
}

impl fmt::Display for ShareCipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareCipherKind::Aes256Gcm => f.write_str("aes-256-gcm"),
            ShareCipherKind::LegacyXorStream => f.write_str("xor-stream"),
        }
    }
}

/// XOR `data` with `key` repeated to `data.len()`.
///
/// Symmetric: applying it twice with the same key restores the input.
fn xor_stream(data: &[u8], key: &[u8]) -> CustodyResult<Vec<u8>> {
    if key.is_empty() {
        return Err(CustodyError::Cipher("empty key".into()));
    }
    Ok(data
        .iter()
        .zip(key.iter().cycle())
        .map(|(d, k)| d ^ k)
        .collect())
}
