//! Seam to the external transfer-execution service (relayer)
//!
//! The coordinator treats the executor as an at-most-once black box: it
//! never calls `transfer` twice for one successful claim, and never calls
//! it while another call for the same link is in flight.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use splitvault_types::{Amount, LinkId};
use thiserror::Error;

/// Move pre-approved funds from the creator to a destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Link being redeemed
    pub link_id: LinkId,
    /// Creator address that granted the delegation
    pub source: String,
    /// Redeemer's address
    pub destination: String,
    /// Exact amount
    pub amount: Amount,
    /// Token or asset identifier
    pub asset: String,
}

/// Release a cancelled link's delegation back to its creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Link being cancelled
    pub link_id: LinkId,
    /// Creator address
    pub source: String,
    /// Amount to release
    pub amount: Amount,
    /// Token or asset identifier
    pub asset: String,
}

/// Opaque success token from the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Transaction hash or relayer job id
    pub reference: String,
}

/// Failure reported by the executor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExecutorError(pub String);

/// External transfer execution
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Execute a redemption transfer
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, ExecutorError>;

    /// Return a cancelled link's funds to the creator
    async fn refund(&self, request: &RefundRequest) -> Result<TransferReceipt, ExecutorError>;
}
