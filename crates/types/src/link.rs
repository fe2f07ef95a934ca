//! Payment link identity and lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Maximum accepted length of a link identifier
pub const MAX_LINK_ID_LEN: usize = 128;

/// Opaque payment link identifier, e.g. `pl_ab12cd34`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LinkId(String);

impl LinkId {
    /// Validate and wrap an identifier
    ///
    /// Accepts ASCII alphanumerics, `_` and `-`.
    pub fn new(value: impl Into<String>) -> Result<Self, TypesError> {
        let value = value.into();
        let valid = !value.is_empty()
            && value.len() <= MAX_LINK_ID_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(TypesError::InvalidLinkId(value));
        }
        Ok(Self(value))
    }

    /// Identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LinkId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LinkId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LinkId> for String {
    fn from(id: LinkId) -> Self {
        id.0
    }
}

/// Lifecycle state of a delegated transfer
///
/// ```text
/// active ──reserve──▶ settling ──success──▶ claimed | cancelled
///   │                    │
///   │                    ├──failure──▶ active
///   │                    └──timeout──▶ settling until reconciled
///   └──now > expires_at──▶ expired
/// ```
///
/// `Settling` is the in-flight marker held while the external transfer call
/// runs; it is what makes the claim transition a single conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Created and redeemable
    Active,
    /// An external transfer for this link is in flight
    Settling,
    /// Redeemed; terminal
    Claimed,
    /// Past its expiry; terminal
    Expired,
    /// Withdrawn by the creator; terminal
    Cancelled,
}

impl LinkState {
    /// No further transitions are possible
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            LinkState::Claimed | LinkState::Expired | LinkState::Cancelled
        )
    }

    /// Lowercase state name
    pub const fn as_str(&self) -> &'static str {
        match self {
            LinkState::Active => "active",
            LinkState::Settling => "settling",
            LinkState::Claimed => "claimed",
            LinkState::Expired => "expired",
            LinkState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkState {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LinkState::Active),
            "settling" => Ok(LinkState::Settling),
            "claimed" => Ok(LinkState::Claimed),
            "expired" => Ok(LinkState::Expired),
            "cancelled" => Ok(LinkState::Cancelled),
            other => Err(TypesError::UnknownState(other.to_string())),
        }
    }
}
