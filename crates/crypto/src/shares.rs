//! Three-way XOR splitting of the root secret
//!
//! ```text
//! passcode_share = PBKDF2(passcode, salt, 64)      never stored
//! server_share   = random 64 bytes                 stored encrypted
//! backup_share   = root ^ passcode_share ^ server  stored, and shown once
//! ```
//!
//! All three fragments are needed to reconstruct. This is plain XOR
//! splitting, not a threshold scheme.

use rand::{CryptoRng, RngCore};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use splitvault_types::ChainWallet;
use tracing::debug;

use crate::cipher::ShareCipherKind;
use crate::derive::derive_verified;
use crate::error::{CustodyError, CustodyResult};
use crate::kdf::{generate_salt, KdfParams, DEFAULT_ITERATIONS};
use crate::secure::{Passcode, RootSecret};

/// Length of the root secret and of every share
pub const ROOT_SECRET_LENGTH: usize = 64;

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// Persisted fragments of one wallet
///
/// Byte fields are hex in JSON. Records written before the `cipher` and
/// `kdf_iterations` fields existed deserialize as the legacy XOR stream at
/// 100 000 iterations.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    /// Public PBKDF2 salt
    #[serde(with = "hex_bytes", default)]
    pub salt: Vec<u8>,
    /// Server share under the passcode-derived key
    #[serde(with = "hex_bytes", default)]
    pub server_share_encrypted: Vec<u8>,
    /// User-held backup share
    #[serde(with = "hex_bytes", default)]
    pub backup_share: Vec<u8>,
    /// Construction used for `server_share_encrypted`
    #[serde(default = "ShareCipherKind::legacy")]
    pub cipher: ShareCipherKind,
    /// PBKDF2 iterations the record was created with
    #[serde(default = "default_iterations")]
    pub kdf_iterations: u32,
}

impl ShareRecord {
    /// Backup share as hex, for one-time display to the user
    pub fn backup_share_hex(&self) -> String {
        hex::encode(&self.backup_share)
    }

    /// KDF parameters this record must be opened with
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams::new(self.kdf_iterations)
    }

    /// Check that every fragment is present and correctly sized.
    pub fn validate(&self) -> CustodyResult<()> {
        if self.salt.is_empty() {
            return Err(CustodyError::MissingFragment("salt"));
        }
        if self.server_share_encrypted.is_empty() {
            return Err(CustodyError::MissingFragment("server_share_encrypted"));
        }
        if self.backup_share.is_empty() {
            return Err(CustodyError::MissingFragment("backup_share"));
        }
        if self.backup_share.len() != ROOT_SECRET_LENGTH {
            return Err(CustodyError::InvalidShareLength {
                expected: ROOT_SECRET_LENGTH,
                actual: self.backup_share.len(),
            });
        }
        let expected = self.cipher.ciphertext_len(ROOT_SECRET_LENGTH);
        if self.server_share_encrypted.len() != expected {
            return Err(CustodyError::InvalidShareLength {
                expected,
                actual: self.server_share_encrypted.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ShareRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareRecord")
            .field("salt", &hex::encode(&self.salt))
            .field("server_share_encrypted", &self.server_share_encrypted.len())
            .field("backup_share", &"[REDACTED]")
            .field("cipher", &self.cipher)
            .field("kdf_iterations", &self.kdf_iterations)
            .finish()
    }
}

/// Result of [`SecretSharingEngine::create`]
///
/// `root_secret` is only here so the caller can derive addresses right
/// away; drop it as soon as that is done.
#[derive(Debug)]
pub struct CreatedShares {
    /// Fragments to persist
    pub record: ShareRecord,
    /// The freshly generated root secret
    pub root_secret: RootSecret,
}

/// Splits and reconstructs root secrets
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretSharingEngine {
    params: KdfParams,
    cipher: ShareCipherKind,
}

impl SecretSharingEngine {
    /// Engine writing new records with `params` and AES-256-GCM
    pub fn new(params: KdfParams) -> Self {
        Self {
            params,
            cipher: ShareCipherKind::default(),
        }
    }

    /// Use `cipher` for new records
    pub fn with_cipher(mut self, cipher: ShareCipherKind) -> Self {
        self.cipher = cipher;
        self
    }

    /// KDF parameters for new records
    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Cipher for new records
    pub fn cipher(&self) -> ShareCipherKind {
        self.cipher
    }

    /// Generate a root secret and split it under `passcode`.
    pub fn create(&self, passcode: &Passcode) -> CustodyResult<CreatedShares> {
        self.create_with_rng(passcode, &mut rand::thread_rng())
    }

    /// [`create`](Self::create) with an explicit RNG
    pub fn create_with_rng<R: CryptoRng + RngCore>(
        &self,
        passcode: &Passcode,
        rng: &mut R,
    ) -> CustodyResult<CreatedShares> {
        let root_secret = RootSecret::generate(rng);
        let record = self.split(&root_secret, passcode, rng)?;
        Ok(CreatedShares {
            record,
            root_secret,
        })
    }

    /// Split an existing root secret under `passcode` with a fresh salt and
    /// fresh server share.
    pub fn split<R: CryptoRng + RngCore>(
        &self,
        root: &RootSecret,
        passcode: &Passcode,
        rng: &mut R,
    ) -> CustodyResult<ShareRecord> {
        let salt = generate_salt(rng);
        let (passcode_share, key) = self.params.derive_share_material(passcode, &salt)?;

        // Same shape and hygiene as a root secret
        let server_share = RootSecret::generate(rng);

        let mut backup = RootSecret::zeroed();
        backup.xor_assign(root.expose_secret());
        backup.xor_assign(passcode_share.expose_secret());
        backup.xor_assign(server_share.expose_secret());

        let server_share_encrypted =
            self.cipher
                .encrypt(server_share.expose_secret(), key.expose_secret(), rng)?;

        debug!(
            cipher = %self.cipher,
            iterations = self.params.iterations,
            "split root secret into shares"
        );

        Ok(ShareRecord {
            salt: salt.to_vec(),
            server_share_encrypted,
            backup_share: backup.expose_secret().to_vec(),
            cipher: self.cipher,
            kdf_iterations: self.params.iterations,
        })
    }

    /// Recombine the three fragments.
    ///
    /// With the legacy XOR cipher a wrong passcode still yields a 64-byte
    /// value; only the address check in [`derive_verified`] can tell. With
    /// AES-256-GCM a wrong passcode fails here with
    /// [`CustodyError::InvalidPasscode`].
    ///
    /// The record's own KDF parameters are used, not the engine's.
    pub fn reconstruct(&self, passcode: &Passcode, record: &ShareRecord) -> CustodyResult<RootSecret> {
        record.validate()?;

        let (passcode_share, key) = record
            .kdf_params()
            .derive_share_material(passcode, &record.salt)?;

        let server_share = record
            .cipher
            .decrypt(&record.server_share_encrypted, key.expose_secret())
            .map_err(|err| match err {
                CustodyError::ShareAuthentication => CustodyError::InvalidPasscode,
                other => other,
            })?;
        if server_share.expose_secret().len() != ROOT_SECRET_LENGTH {
            return Err(CustodyError::InvalidShareLength {
                expected: ROOT_SECRET_LENGTH,
                actual: server_share.expose_secret().len(),
            });
        }

        let mut root = RootSecret::zeroed();
        root.xor_assign(passcode_share.expose_secret());
        root.xor_assign(server_share.expose_secret());
        root.xor_assign(&record.backup_share);
        Ok(root)
    }

    /// Re-split the same root secret under a new passcode.
    ///
    /// `anchor` is any wallet derived from this record; it guards against
    /// re-splitting garbage when the old passcode is wrong. Addresses are
    /// unchanged afterwards.
    pub fn rotate(
        &self,
        old: &Passcode,
        new: &Passcode,
        record: &ShareRecord,
        anchor: &ChainWallet,
    ) -> CustodyResult<ShareRecord> {
        let root = self.reconstruct(old, record)?;
        derive_verified(&root, anchor)?;
        let rotated = self.split(&root, new, &mut rand::thread_rng())?;
        debug!(chain = %anchor.chain, "rotated passcode");
        Ok(rotated)
    }
}

/// Hex (de)serialization for share bytes
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
