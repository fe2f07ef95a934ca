//! Parse errors for domain types

use thiserror::Error;

/// Errors raised while parsing or validating domain types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// Chain name not recognised
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Amount is not a non-negative decimal string
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Link identifier is empty, too long or contains illegal characters
    #[error("invalid link id: {0}")]
    InvalidLinkId(String),

    /// Link state name not recognised
    #[error("unknown link state: {0}")]
    UnknownState(String),
}
