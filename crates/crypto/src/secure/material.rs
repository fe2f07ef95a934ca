//! The 64-byte root secret
//!
//! `RootSecret` is the single source of signing authority for an account.
//! It exists only while a wallet is being created or a signature is being
//! produced:
//! - zeroized when dropped (even on early return or panic)
//! - redacted in `Debug` output
//! - deliberately not `Clone`

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use super::secret::SecretArray;
use crate::shares::ROOT_SECRET_LENGTH;

/// Root secret from which every chain keypair is derived.
pub struct RootSecret(SecretArray<ROOT_SECRET_LENGTH>);

impl RootSecret {
    /// Draw a fresh root secret from a cryptographic RNG.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; ROOT_SECRET_LENGTH];
        rng.fill_bytes(&mut bytes);
        let secret = Self(SecretArray::new(bytes));
        zeroize::Zeroize::zeroize(&mut bytes);
        secret
    }

    /// Wrap existing bytes.
    pub fn from_bytes(bytes: [u8; ROOT_SECRET_LENGTH]) -> Self {
        Self(SecretArray::new(bytes))
    }

    /// All-zero secret, used as the XOR accumulator during reconstruction.
    pub(crate) fn zeroed() -> Self {
        Self(SecretArray::new([0u8; ROOT_SECRET_LENGTH]))
    }

    /// Expose the raw bytes for derivation.
    ///
    /// The reference must not outlive the current operation.
    #[inline]
    pub fn expose_secret(&self) -> &[u8; ROOT_SECRET_LENGTH] {
        self.0.expose_secret()
    }

    /// XOR `other` into this secret in place.
    ///
    /// `other` must be exactly [`ROOT_SECRET_LENGTH`] bytes; callers check.
    pub(crate) fn xor_assign(&mut self, other: &[u8]) {
        debug_assert_eq!(other.len(), ROOT_SECRET_LENGTH);
        self.0.xor_in_place(other);
    }

    /// Constant-time equality.
    pub fn ct_eq(&self, other: &RootSecret) -> bool {
        self.expose_secret()
            .ct_eq(other.expose_secret())
            .into()
    }
}

impl std::fmt::Debug for RootSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
