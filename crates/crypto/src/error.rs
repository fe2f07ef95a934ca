//! Custody error types

use splitvault_types::TypesError;
use thiserror::Error;

/// Errors raised by share handling, derivation and reconstruction
///
/// `InvalidPasscode` is the only signal that a passcode was wrong. It never
/// says which fragment disagreed, because there is no way to know.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustodyError {
    /// Reconstructed key material does not match the stored wallet
    #[error("invalid passcode")]
    InvalidPasscode,

    /// Passcode is not exactly six ASCII digits
    #[error("passcode must be exactly 6 digits")]
    InvalidPasscodeFormat,

    /// A required share or the salt is absent from storage
    #[error("missing fragment: {0}")]
    MissingFragment(&'static str),

    /// A share has the wrong length
    #[error("invalid share length: expected {expected}, got {actual}")]
    InvalidShareLength { expected: usize, actual: usize },

    /// Chain not supported by this engine
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Malformed or non-hardened derivation path
    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    /// Derived bytes are not a valid private scalar
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    /// Public key bytes do not decode to a curve point
    #[error("invalid public key bytes")]
    InvalidPublicKey,

    /// Signature bytes are malformed
    #[error("invalid signature bytes")]
    InvalidSignature,

    /// Address string cannot be parsed for its chain
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// AEAD tag did not verify (wrong key or tampered ciphertext)
    #[error("share authentication failed")]
    ShareAuthentication,

    /// Invalid KDF parameters
    #[error("invalid KDF parameters: {0}")]
    Kdf(String),

    /// Cipher setup or operation failed
    #[error("cipher operation failed: {0}")]
    Cipher(String),
}

impl From<TypesError> for CustodyError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::UnsupportedChain(chain) => CustodyError::UnsupportedChain(chain),
            other => CustodyError::InvalidAddress(other.to_string()),
        }
    }
}

/// Result type for custody operations
pub type CustodyResult<T> = Result<T, CustodyError>;
