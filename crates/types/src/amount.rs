//! Decimal amount carried as its exact string form
//!
//! One-time codes are bound to the amount's bytes, so `"10.50"` and `"10.5"`
//! are deliberately different amounts. No normalisation is applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Maximum accepted length of an amount string
pub const MAX_AMOUNT_LEN: usize = 78;

/// Non-negative decimal amount, e.g. `"10.50"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(String);

impl Amount {
    /// Validate and wrap a decimal string
    pub fn new(value: impl Into<String>) -> Result<Self, TypesError> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_AMOUNT_LEN {
            return Err(TypesError::InvalidAmount(value));
        }

        let (int_part, frac_part) = match value.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (value.as_str(), None),
        };

        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        let valid = !int_part.is_empty()
            && digits(int_part)
            && frac_part.map_or(true, |f| !f.is_empty() && digits(f));

        if !valid {
            return Err(TypesError::InvalidAmount(value));
        }
        Ok(Self(value))
    }

    /// The exact string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when every digit is zero
    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0' || b == b'.')
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Amount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_amounts() {
        for s in ["0", "10", "10.50", "0.000001", "1000000"] {
            assert_eq!(Amount::new(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn test_invalid_amounts() {
        for s in ["", "-1", "1.", ".5", "1.2.3", "1e5", "ten", " 1"] {
            assert!(Amount::new(s).is_err(), "{s:?} should be rejected");
        }
    }

    #[test]
    fn test_no_normalisation() {
        assert_ne!(Amount::new("10.50").unwrap(), Amount::new("10.5").unwrap());
    }

    #[test]
    fn test_is_zero() {
        assert!(Amount::new("0.00").unwrap().is_zero());
        assert!(!Amount::new("0.01").unwrap().is_zero());
    }

    #[test]
    fn test_serde_rejects_invalid() {
        assert!(serde_json::from_str::<Amount>("\"abc\"").is_err());
        let amount: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(amount.as_str(), "12.5");
    }
}
