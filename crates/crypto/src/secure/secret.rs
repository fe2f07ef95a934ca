//! Zeroizing byte containers

use secrecy::SecretBox;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Variable-length secret bytes (PBKDF2 output, decrypted shares)
pub type SecretBytes = SecretBox<Vec<u8>>;

/// Secret text, wiped on drop
pub type SecretString = secrecy::SecretString;

/// Move `bytes` into a [`SecretBytes`]
pub fn secret_bytes(bytes: Vec<u8>) -> SecretBytes {
    SecretBox::new(Box::new(bytes))
}

/// Fixed-width key material, wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretArray<const N: usize>([u8; N]);

impl<const N: usize> SecretArray<N> {
    /// Take ownership of `bytes`
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Copy the first `N` bytes of `source`, if it is long enough
    pub fn from_prefix(source: &[u8]) -> Option<Self> {
        let prefix = source.get(..N)?;
        let mut out = Self([0u8; N]);
        out.0.copy_from_slice(prefix);
        Some(out)
    }

    /// Borrow the bytes for the duration of one operation
    pub fn expose_secret(&self) -> &[u8; N] {
        &self.0
    }

    /// XOR `other` into these bytes. Extra bytes in `other` are ignored.
    pub(crate) fn xor_in_place(&mut self, other: &[u8]) {
        self.0.iter_mut().zip(other).for_each(|(dst, src)| *dst ^= src);
    }
}

impl<const N: usize> std::fmt::Debug for SecretArray<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretArray<{N}>([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_debug_is_redacted() {
        let debug = format!("{:?}", SecretArray::new([0xABu8; 32]));
        assert_eq!(debug, "SecretArray<32>([REDACTED])");
    }

    #[test]
    fn test_from_prefix() {
        let source: Vec<u8> = (0u8..64).collect();
        let key = SecretArray::<32>::from_prefix(&source).unwrap();
        assert_eq!(&key.expose_secret()[..], &source[..32]);
        assert!(SecretArray::<32>::from_prefix(&source[..31]).is_none());
    }

    #[test]
    fn test_xor_in_place_is_involutive() {
        let mut a = SecretArray::new([0x5Au8; 4]);
        a.xor_in_place(&[1, 2, 3, 4]);
        assert_eq!(a.expose_secret(), &[0x5B, 0x58, 0x59, 0x5E]);
        a.xor_in_place(&[1, 2, 3, 4]);
        assert_eq!(a.expose_secret(), &[0x5A; 4]);
    }

    #[test]
    fn test_secret_bytes() {
        let secret = secret_bytes(vec![1u8, 2, 3]);
        assert_eq!(secret.expose_secret().as_slice(), &[1, 2, 3]);
    }
}
