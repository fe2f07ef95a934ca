//! Payment link error types

use splitvault_types::{LinkId, LinkState, TypesError};
use thiserror::Error;

/// Errors raised by link creation, claim and cancellation
///
/// Display strings never include a one-time code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The link is past its expiry
    #[error("payment link has expired")]
    ExpiredLink,

    /// The link was already claimed, or a claim is in flight
    #[error("payment link has already been claimed")]
    AlreadyClaimed,

    /// The link is in a state that does not allow this operation
    #[error("payment link is not active (state: {0})")]
    LinkNotActive(LinkState),

    /// The one-time code did not verify
    #[error("one-time code does not match")]
    OtpMismatch,

    /// The external transfer failed, or timed out with an unknown outcome
    #[error("transfer execution failed: {0}")]
    TransferExecutionFailed(String),

    /// No link with this id
    #[error("payment link not found: {0}")]
    NotFound(LinkId),

    /// A link with this id already exists
    #[error("payment link already exists: {0}")]
    DuplicateLink(LinkId),

    /// Destination address is empty or malformed
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// Malformed link attributes
    #[error("invalid link: {0}")]
    InvalidLink(String),

    /// Backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl LinkError {
    /// True when the same request may succeed if retried.
    ///
    /// Expired, claimed and cancelled links will never succeed; a wrong
    /// code can be retried with a different code.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LinkError::TransferExecutionFailed(_) | LinkError::OtpMismatch | LinkError::Storage(_)
        )
    }
}

impl From<TypesError> for LinkError {
    fn from(err: TypesError) -> Self {
        LinkError::InvalidLink(err.to_string())
    }
}

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;
