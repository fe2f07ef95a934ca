//! Delegated transfer coordinator
//!
//! Drives a [`PaymentLink`] through its lifecycle:
//!
//! ```text
//!            claim (reserve)          transfer ok
//!  Active ──────────────────▶ Settling ───────────▶ Claimed
//!    ▲  │                        │  │
//!    │  │ cancel (reserve)       │  │ timed out: stays Settling
//!    │  └──────▶ Settling ───────┤  └──▶ reconcile ──▶ Claimed | Cancelled | Active
//!    │              │ refund ok  │
//!    │              ▼            │ executor reported failure
//!    │          Cancelled        │
//!    └───────────────────────────┘
//!
//!  Active ── now > expires_at ──▶ Expired
//! ```
//!
//! Every transition is a [`LinkStore::compare_and_set`]. The move into
//! `Settling` is the reservation: only the caller whose write lands calls the
//! executor, so two racing claims produce one external transfer.
//!
//! A timed-out executor call may still have moved funds. Such a link keeps
//! its reservation until [`DelegatedTransferCoordinator::reconcile`] records
//! what the executor actually did.

use rand::rngs::OsRng;
use splitvault_types::{Amount, LinkId, LinkState};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::LinkConfig;
use crate::error::{LinkError, LinkResult};
use crate::executor::{
    ExecutorError, RefundRequest, TransferExecutor, TransferReceipt, TransferRequest,
};
use crate::otc::{GeneratedCode, OneTimeCodeCodec};
use crate::store::{CasOutcome, LinkStore, PaymentLink, StateUpdate};

/// Parameters for a new link
#[derive(Debug, Clone)]
pub struct NewLink {
    /// Link identifier
    pub id: LinkId,
    /// Creator address that pre-approved the transfer
    pub creator: String,
    /// Token or asset identifier
    pub asset: String,
    /// Amount
    pub amount: Amount,
    /// Lifetime; the coordinator default when `None`
    pub ttl: Option<Duration>,
    /// Key the code with a fresh random per-link key
    pub per_link_key: bool,
}

/// A stored link and its code
///
/// The code is handed to the creator once and is not recoverable later from
/// a per-link-keyed record without the key.
#[derive(Debug)]
pub struct CreatedLink {
    /// Stored link
    pub link: PaymentLink,
    /// One-time code for the redeemer
    pub code: GeneratedCode,
}

/// Successful claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    /// Claimed link
    pub link_id: LinkId,
    /// Funds destination
    pub destination: String,
    /// Executor reference
    pub reference: String,
}

/// What the executor reported for a reconciled `Settling` link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResolution {
    /// The transfer or refund went through with this reference
    Executed(String),
    /// Nothing was moved; the link is redeemable again
    NotExecuted,
}

/// Outcome of one bounded executor call
enum Execution {
    Done(TransferReceipt),
    /// The executor answered with an error; nothing was moved
    Failed(String),
    /// No answer within the timeout; funds may or may not have moved
    Unknown(String),
}

/// Coordinates link creation, redemption, cancellation and expiry
pub struct DelegatedTransferCoordinator {
    store: Arc<dyn LinkStore>,
    executor: Arc<dyn TransferExecutor>,
    clock: Arc<dyn Clock>,
    codec: Arc<OneTimeCodeCodec>,
    default_ttl: Duration,
    transfer_timeout: Duration,
}

impl DelegatedTransferCoordinator {
    /// Coordinator with the wall clock and the given timing
    pub fn new(
        store: Arc<dyn LinkStore>,
        executor: Arc<dyn TransferExecutor>,
        codec: Arc<OneTimeCodeCodec>,
        default_ttl: Duration,
        transfer_timeout: Duration,
    ) -> Self {
        Self {
            store,
            executor,
            clock: Arc::new(SystemClock),
            codec,
            default_ttl,
            transfer_timeout,
        }
    }

    /// Coordinator configured from a validated [`LinkConfig`]
    pub fn from_config(
        config: &LinkConfig,
        store: Arc<dyn LinkStore>,
        executor: Arc<dyn TransferExecutor>,
    ) -> LinkResult<Self> {
        config.validate()?;
        let codec = OneTimeCodeCodec::new(config.otc_secret()?)?;
        Ok(Self::new(
            store,
            executor,
            Arc::new(codec),
            config.default_ttl(),
            config.transfer_timeout(),
        ))
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Code codec in use
    pub fn codec(&self) -> &OneTimeCodeCodec {
        &self.codec
    }

    /// Create and store an `Active` link
    pub async fn create_link(&self, params: NewLink) -> LinkResult<CreatedLink> {
        if params.creator.trim().is_empty() {
            return Err(LinkError::InvalidLink("creator address is empty".into()));
        }
        if params.asset.trim().is_empty() {
            return Err(LinkError::InvalidLink("asset is empty".into()));
        }
        if params.amount.is_zero() {
            return Err(LinkError::InvalidLink("amount is zero".into()));
        }

        let now = self.clock.now();
        let ttl = params.ttl.unwrap_or(self.default_ttl);
        let (otc, code) = if params.per_link_key {
            self.codec
                .generate_with_link_key(&params.id, &params.amount, now, &mut OsRng)?
        } else {
            self.codec.issue(&params.id, &params.amount, now)?
        };

        let link = PaymentLink {
            otc,
            creator: params.creator,
            asset: params.asset,
            expires_at: now.saturating_add(ttl),
            state: LinkState::Active,
            destination: None,
            transfer_ref: None,
            updated_at: now,
        };
        self.store.insert(link.clone()).await?;

        info!(
            link_id = %link.id(),
            amount = %link.amount(),
            expires_at = %link.expires_at,
            per_link_key = params.per_link_key,
            "Created payment link"
        );
        Ok(CreatedLink { link, code })
    }

    /// Current stored link
    pub async fn get(&self, id: &LinkId) -> LinkResult<PaymentLink> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LinkError::NotFound(id.clone()))
    }

    /// Redeem a link with its one-time code.
    ///
    /// Checks run in order: expiry, state, code. Only then is the link
    /// reserved and the executor called. When the executor reports a failure
    /// the reservation is released and the claim can be retried. When the
    /// call times out the link stays `Settling` and later claims fail with
    /// `AlreadyClaimed` until [`Self::reconcile`] resolves it.
    pub async fn claim(
        &self,
        id: &LinkId,
        code: &str,
        destination: &str,
    ) -> LinkResult<ClaimReceipt> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(LinkError::InvalidDestination("destination is empty".into()));
        }

        let link = self.get(id).await?;
        let now = self.clock.now();

        if link.is_expired_at(now) {
            self.mark_expired(&link).await?;
            debug!(link_id = %id, "Claim rejected: link expired");
            return Err(LinkError::ExpiredLink);
        }
        if link.state != LinkState::Active {
            debug!(link_id = %id, state = %link.state, "Claim rejected: link not active");
            return Err(state_error(link.state));
        }
        if !self.codec.verify_record(code, &link.otc) {
            debug!(link_id = %id, "Claim rejected: code mismatch");
            return Err(LinkError::OtpMismatch);
        }

        let reserve = StateUpdate::to(LinkState::Settling, now).with_destination(destination);
        match self
            .store
            .compare_and_set(id, LinkState::Active, reserve)
            .await?
        {
            CasOutcome::Applied(_) => {}
            CasOutcome::Conflict(state) => {
                debug!(link_id = %id, state = %state, "Claim lost reservation race");
                return Err(state_error(state));
            }
        }

        let request = TransferRequest {
            link_id: id.clone(),
            source: link.creator.clone(),
            destination: destination.to_string(),
            amount: link.amount().clone(),
            asset: link.asset.clone(),
        };
        match self.run_bounded(self.executor.transfer(&request)).await {
            Execution::Done(receipt) => {
                let done = StateUpdate::to(LinkState::Claimed, self.clock.now())
                    .with_destination(destination)
                    .with_transfer_ref(receipt.reference.clone());
                self.settle(id, done).await?;
                info!(link_id = %id, reference = %receipt.reference, "Payment link claimed");
                Ok(ClaimReceipt {
                    link_id: id.clone(),
                    destination: destination.to_string(),
                    reference: receipt.reference,
                })
            }
            Execution::Failed(reason) => {
                self.release(id).await?;
                warn!(link_id = %id, error = %reason, "Transfer failed, link reopened");
                Err(LinkError::TransferExecutionFailed(reason))
            }
            Execution::Unknown(reason) => {
                warn!(link_id = %id, error = %reason, "Transfer outcome unknown, link held settling");
                Err(LinkError::TransferExecutionFailed(reason))
            }
        }
    }

    /// Withdraw an `Active` link and return its funds to the creator
    pub async fn cancel(&self, id: &LinkId) -> LinkResult<PaymentLink> {
        let link = self.get(id).await?;
        let now = self.clock.now();

        if link.is_expired_at(now) {
            self.mark_expired(&link).await?;
            return Err(LinkError::ExpiredLink);
        }

        match self
            .store
            .compare_and_set(id, LinkState::Active, StateUpdate::to(LinkState::Settling, now))
            .await?
        {
            CasOutcome::Applied(_) => {}
            CasOutcome::Conflict(state) => return Err(state_error(state)),
        }

        let request = RefundRequest {
            link_id: id.clone(),
            source: link.creator.clone(),
            amount: link.amount().clone(),
            asset: link.asset.clone(),
        };
        match self.run_bounded(self.executor.refund(&request)).await {
            Execution::Done(receipt) => {
                let done = StateUpdate::to(LinkState::Cancelled, self.clock.now())
                    .with_transfer_ref(receipt.reference);
                let link = self.settle(id, done).await?;
                info!(link_id = %id, "Payment link cancelled");
                Ok(link)
            }
            Execution::Failed(reason) => {
                self.release(id).await?;
                warn!(link_id = %id, error = %reason, "Refund failed, link reopened");
                Err(LinkError::TransferExecutionFailed(reason))
            }
            Execution::Unknown(reason) => {
                warn!(link_id = %id, error = %reason, "Refund outcome unknown, link held settling");
                Err(LinkError::TransferExecutionFailed(reason))
            }
        }
    }

    /// Resolve a link left `Settling` by a timed-out executor call.
    ///
    /// A claim reservation carries its destination, a cancel reservation
    /// does not; an executed settlement therefore lands in `Claimed` or
    /// `Cancelled` respectively.
    pub async fn reconcile(
        &self,
        id: &LinkId,
        resolution: SettlementResolution,
    ) -> LinkResult<PaymentLink> {
        let link = self.get(id).await?;
        if link.state != LinkState::Settling {
            return Err(LinkError::LinkNotActive(link.state));
        }

        let now = self.clock.now();
        let update = match &resolution {
            SettlementResolution::Executed(reference) => {
                let state = if link.destination.is_some() {
                    LinkState::Claimed
                } else {
                    LinkState::Cancelled
                };
                StateUpdate::to(state, now).with_transfer_ref(reference.clone())
            }
            SettlementResolution::NotExecuted => {
                StateUpdate::to(LinkState::Active, now).clearing_destination()
            }
        };
        let link = self.settle(id, update).await?;
        info!(link_id = %id, state = %link.state, "Reconciled settling link");
        Ok(link)
    }

    /// Move every `Active` link past its expiry to `Expired`.
    ///
    /// Returns the ids that were expired by this sweep.
    pub async fn expire_stale(&self) -> LinkResult<Vec<LinkId>> {
        let now = self.clock.now();
        let mut expired = Vec::new();
        for link in self.store.list_by_state(LinkState::Active).await? {
            if !link.is_expired_at(now) {
                continue;
            }
            let update = StateUpdate::to(LinkState::Expired, now);
            if let CasOutcome::Applied(_) = self
                .store
                .compare_and_set(link.id(), LinkState::Active, update)
                .await?
            {
                expired.push(link.id().clone());
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired stale payment links");
        }
        Ok(expired)
    }

    async fn mark_expired(&self, link: &PaymentLink) -> LinkResult<()> {
        if link.state != LinkState::Active {
            return Ok(());
        }
        let update = StateUpdate::to(LinkState::Expired, self.clock.now());
        if let CasOutcome::Applied(_) = self
            .store
            .compare_and_set(link.id(), LinkState::Active, update)
            .await?
        {
            info!(link_id = %link.id(), "Payment link expired");
        }
        Ok(())
    }

    async fn run_bounded<F>(&self, call: F) -> Execution
    where
        F: Future<Output = Result<TransferReceipt, ExecutorError>>,
    {
        match timeout(self.transfer_timeout, call).await {
            Ok(Ok(receipt)) => Execution::Done(receipt),
            Ok(Err(e)) => Execution::Failed(e.to_string()),
            Err(_) => Execution::Unknown(format!(
                "executor timed out after {}ms, outcome unknown",
                self.transfer_timeout.as_millis()
            )),
        }
    }

    async fn settle(&self, id: &LinkId, update: StateUpdate) -> LinkResult<PaymentLink> {
        match self
            .store
            .compare_and_set(id, LinkState::Settling, update)
            .await?
        {
            CasOutcome::Applied(link) => Ok(link),
            CasOutcome::Conflict(state) => Err(LinkError::Storage(format!(
                "link {id} left settling while reserved (now {state})"
            ))),
        }
    }

    async fn release(&self, id: &LinkId) -> LinkResult<()> {
        let update = StateUpdate::to(LinkState::Active, self.clock.now()).clearing_destination();
        match self
            .store
            .compare_and_set(id, LinkState::Settling, update)
            .await?
        {
            CasOutcome::Applied(_) => Ok(()),
            CasOutcome::Conflict(state) => Err(LinkError::Storage(format!(
                "link {id} left settling while reserved (now {state})"
            ))),
        }
    }
}

fn state_error(state: LinkState) -> LinkError {
    match state {
        LinkState::Claimed | LinkState::Settling => LinkError::AlreadyClaimed,
        LinkState::Expired => LinkError::ExpiredLink,
        other => LinkError::LinkNotActive(other),
    }
}
