//! Secure memory handling for custody secrets
//!
//! Every transient secret in the custody path lives in one of these
//! containers:
//! - [`RootSecret`]: the 64-byte root, zeroized on drop, never `Clone`
//! - [`Passcode`]: a validated six-digit passcode held as a [`SecretString`]
//! - [`SecretBytes`]: derived key material and decrypted shares
//!
//! Debug output shows `[REDACTED]` instead of secret bytes.

mod material;
mod passcode;
mod secret;

pub use material::RootSecret;
pub use passcode::{Passcode, PASSCODE_LENGTH};
pub use secret::{secret_bytes, SecretArray, SecretBytes, SecretString};

pub use secrecy::ExposeSecret;
