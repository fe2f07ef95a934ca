//! Payment links for splitvault
//!
//! A payment link is a transfer the creator has pre-approved and a third
//! party later redeems with a six-digit one-time code.
//!
//! - [`otc`]: deterministic code generation and verification bound to
//!   `(link id, amount, created at)`
//! - [`coordinator`]: the link state machine with an exactly-once claim
//! - [`store`]: the [`LinkStore`] trait and an in-memory implementation
//! - [`executor`]: the [`TransferExecutor`] seam to the relaying service
//! - [`clock`]: injectable time source
//! - [`config`]: JSON configuration with environment overrides

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod otc;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LinkConfig;
pub use coordinator::{
    ClaimReceipt, CreatedLink, DelegatedTransferCoordinator, NewLink, SettlementResolution,
};
pub use error::{LinkError, LinkResult};
pub use executor::{ExecutorError, RefundRequest, TransferExecutor, TransferReceipt, TransferRequest};
pub use otc::{GeneratedCode, OneTimeCodeCodec, OtcRecord, CODE_LENGTH};
pub use store::{CasOutcome, InMemoryLinkStore, LinkStore, PaymentLink, StateUpdate};
