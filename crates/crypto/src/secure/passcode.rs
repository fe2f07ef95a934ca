//! Six-digit numeric passcode

use std::str::FromStr;

use secrecy::ExposeSecret;

use super::secret::SecretString;
use crate::error::{CustodyError, CustodyResult};

/// Number of ASCII digits in a passcode
pub const PASSCODE_LENGTH: usize = 6;

/// A validated six-digit passcode.
///
/// Leading zeros are significant; `"000123"` and `"123"` are different
/// (the latter is rejected).
pub struct Passcode(SecretString);

impl Passcode {
    /// Validate and wrap a passcode.
    pub fn new(passcode: &str) -> CustodyResult<Self> {
        if passcode.len() != PASSCODE_LENGTH || !passcode.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CustodyError::InvalidPasscodeFormat);
        }
        Ok(Self(SecretString::from(passcode.to_owned())))
    }

    /// Passcode bytes, used as the PBKDF2 password.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }
}

impl FromStr for Passcode {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Debug for Passcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passcode([REDACTED])")
    }
}
