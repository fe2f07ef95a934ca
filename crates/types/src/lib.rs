//! Core domain types for splitvault.
//!
//! This crate holds the small, dependency-light vocabulary shared by the key
//! custody engine (`splitvault-crypto`) and the payment link coordinator
//! (`splitvault-links`): supported chains and their curve families, the public
//! part of a derived chain wallet, decimal amounts, link identifiers, link
//! lifecycle states and millisecond timestamps.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod amount;
pub mod chain;
pub mod error;
pub mod link;
pub mod time;

pub use amount::Amount;
pub use chain::{Chain, ChainWallet, CurveFamily, CANONICAL_EVM_TAG};
pub use error::TypesError;
pub use link::{LinkId, LinkState};
pub use time::TimestampMillis;
