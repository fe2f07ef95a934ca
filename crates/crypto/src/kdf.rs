//! Passcode key derivation
//!
//! PBKDF2-HMAC-SHA256 over a six-digit passcode and a 16-byte public salt.
//! The iteration count is the only defence against brute force of the
//! 10^6 passcode space, so it is validated against a floor.
//!
//! PBKDF2 output is prefix-stable: the first 32 bytes of a 64-byte
//! derivation equal a 32-byte derivation with the same inputs. The share
//! engine relies on this to run the KDF once per operation.

use pbkdf2::pbkdf2_hmac;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{CustodyError, CustodyResult};
use crate::secure::{secret_bytes, Passcode, SecretArray, SecretBytes};
use crate::shares::ROOT_SECRET_LENGTH;

/// Default PBKDF2 iteration count
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Lowest iteration count accepted by [`KdfParams::validate`]
pub const MIN_ITERATIONS: u32 = 1_000;

/// Salt length in bytes
pub const SALT_LENGTH: usize = 16;

/// Share-cipher key length in bytes
pub const ENCRYPTION_KEY_LENGTH: usize = 32;

/// PBKDF2 parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// HMAC-SHA256 iteration count
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Parameters with an explicit iteration count
    pub const fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Reject iteration counts below [`MIN_ITERATIONS`]
    pub fn validate(&self) -> CustodyResult<()> {
        if self.iterations < MIN_ITERATIONS {
            return Err(CustodyError::Kdf(format!(
                "iterations must be at least {}, got {}",
                MIN_ITERATIONS, self.iterations
            )));
        }
        Ok(())
    }

    /// Derive `output_len` bytes from a passcode and salt.
    ///
    /// Pure: identical inputs always give identical output.
    pub fn derive(
        &self,
        passcode: &Passcode,
        salt: &[u8],
        output_len: usize,
    ) -> CustodyResult<SecretBytes> {
        self.validate()?;
        if output_len == 0 {
            return Err(CustodyError::Kdf("output length must be positive".into()));
        }
        let mut output = vec![0u8; output_len];
        pbkdf2_hmac::<Sha256>(passcode.as_bytes(), salt, self.iterations, &mut output);
        Ok(secret_bytes(output))
    }

    /// Derive the passcode share (64 bytes) and the share-cipher key
    /// (32 bytes) in a single PBKDF2 run.
    pub fn derive_share_material(
        &self,
        passcode: &Passcode,
        salt: &[u8],
    ) -> CustodyResult<(SecretBytes, SecretArray<ENCRYPTION_KEY_LENGTH>)> {
        use secrecy::ExposeSecret;

        let share = self.derive(passcode, salt, ROOT_SECRET_LENGTH)?;
        let key = SecretArray::from_prefix(share.expose_secret())
            .ok_or_else(|| CustodyError::Kdf("derived share shorter than cipher key".into()))?;
        Ok((share, key))
    }
}

/// Generate a random salt
pub fn generate_salt<R: CryptoRng + RngCore>(rng: &mut R) -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const TEST_PARAMS: KdfParams = KdfParams::new(MIN_ITERATIONS);

    fn passcode(s: &str) -> Passcode {
        Passcode::new(s).unwrap()
    }

    #[test]
    fn test_derive_is_deterministic() {
        let salt = [0xAA; SALT_LENGTH];
        let a = TEST_PARAMS.derive(&passcode("123456"), &salt, 64).unwrap();
        let b = TEST_PARAMS.derive(&passcode("123456"), &salt, 64).unwrap();
        assert_eq!(a.expose_secret(), b.expose_secret());
        assert_eq!(a.expose_secret().len(), 64);

        let c = TEST_PARAMS.derive(&passcode("123457"), &salt, 64).unwrap();
        assert_ne!(a.expose_secret(), c.expose_secret());

        let d = TEST_PARAMS
            .derive(&passcode("123456"), &[0xAB; SALT_LENGTH], 64)
            .unwrap();
        assert_ne!(a.expose_secret(), d.expose_secret());
    }

    #[test]
    fn test_prefix_stability() {
        let salt = [0x11; SALT_LENGTH];
        let long = TEST_PARAMS.derive(&passcode("000001"), &salt, 64).unwrap();
        let short = TEST_PARAMS.derive(&passcode("000001"), &salt, 32).unwrap();
        assert_eq!(&long.expose_secret()[..32], short.expose_secret().as_slice());

        let (share, key) = TEST_PARAMS
            .derive_share_material(&passcode("000001"), &salt)
            .unwrap();
        assert_eq!(share.expose_secret(), long.expose_secret());
        assert_eq!(key.expose_secret().as_slice(), short.expose_secret().as_slice());
    }

    #[test]
    fn test_known_answer() {
        // PBKDF2-HMAC-SHA256 known answer: P="password", S="salt", c=1, dkLen=32
        let mut out = [0u8; 32];
        pbkdf2_hmac::<Sha256>(b"password", b"salt", 1, &mut out);
        assert_eq!(
            hex::encode(out),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
    }

    #[test]
    fn test_validate() {
        assert!(KdfParams::default().validate().is_ok());
        assert!(KdfParams::new(MIN_ITERATIONS).validate().is_ok());
        assert!(matches!(
            KdfParams::new(999).validate(),
            Err(CustodyError::Kdf(_))
        ));
        assert!(TEST_PARAMS
            .derive(&passcode("123456"), &[0; SALT_LENGTH], 0)
            .is_err());
    }

    #[test]
    fn test_default_iterations() {
        assert_eq!(KdfParams::default().iterations, 100_000);
        let salt = [0x42; SALT_LENGTH];
        let out = KdfParams::default()
            .derive(&passcode("654321"), &salt, 32)
            .unwrap();
        assert_eq!(out.expose_secret().len(), 32);
    }

    #[test]
    fn test_generate_salt() {
        let mut rng = rand::thread_rng();
        let a = generate_salt(&mut rng);
        let b = generate_salt(&mut rng);
        assert_ne!(a, b);
    }
}
