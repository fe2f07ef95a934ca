//! Payment link storage
//!
//! [`LinkStore::compare_and_set`] is the only way to change a link's state.
//! It checks the current state and writes the new one under a single lock
//! (or a single conditional `UPDATE ... WHERE state = ?` in a SQL backend),
//! which is what makes claims exactly-once.
//!
//! # Concurrency
//!
//! [`InMemoryLinkStore`] keeps every link under one `parking_lot::RwLock`.
//! Locks are never held across an `.await`.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use splitvault_types::{Amount, LinkId, LinkState, TimestampMillis};
use std::collections::HashMap;

use crate::error::{LinkError, LinkResult};
use crate::otc::OtcRecord;

/// A delegated transfer and its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    /// Immutable one-time-code record (id, amount, creation time)
    pub otc: OtcRecord,
    /// Creator address that approved the transfer
    pub creator: String,
    /// Token or asset identifier
    pub asset: String,
    /// Claims after this instant fail with `ExpiredLink`
    pub expires_at: TimestampMillis,
    /// Current state
    pub state: LinkState,
    /// Redeemer address, set on claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Executor reference, set on claim or cancel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_ref: Option<String>,
    /// Last state change
    pub updated_at: TimestampMillis,
}

impl PaymentLink {
    /// Link identifier
    pub fn id(&self) -> &LinkId {
        &self.otc.link_id
    }

    /// Amount
    pub fn amount(&self) -> &Amount {
        &self.otc.amount
    }

    /// Creation time
    pub fn created_at(&self) -> TimestampMillis {
        self.otc.created_at
    }

    /// Strictly past expiry at `now`
    pub fn is_expired_at(&self, now: TimestampMillis) -> bool {
        now > self.expires_at
    }
}

/// State change applied by [`LinkStore::compare_and_set`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    /// New state
    pub state: LinkState,
    /// Destination to record, if any
    pub destination: Option<String>,
    /// Drop any recorded destination
    pub clear_destination: bool,
    /// Transfer reference to record, if any
    pub transfer_ref: Option<String>,
    /// Time of the change
    pub at: TimestampMillis,
}

impl StateUpdate {
    /// Plain state change
    pub fn to(state: LinkState, at: TimestampMillis) -> Self {
        Self {
            state,
            destination: None,
            clear_destination: false,
            transfer_ref: None,
            at,
        }
    }

    /// Record a destination
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Forget the destination written by a released reservation
    pub fn clearing_destination(mut self) -> Self {
        self.destination = None;
        self.clear_destination = true;
        self
    }

    /// Record a transfer reference
    pub fn with_transfer_ref(mut self, reference: impl Into<String>) -> Self {
        self.transfer_ref = Some(reference.into());
        self
    }
}

/// Result of a conditional state write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The link was in the expected state; here is the updated link
    Applied(PaymentLink),
    /// The link was in another state; nothing was written
    Conflict(LinkState),
}

/// Link persistence
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Store a new link
    ///
    /// # Returns
    /// * `Err(LinkError::DuplicateLink)` if the id is taken
    async fn insert(&self, link: PaymentLink) -> LinkResult<()>;

    /// Get a link by id
    async fn get(&self, id: &LinkId) -> LinkResult<Option<PaymentLink>>;

    /// Atomically apply `update` only if the link is in `expected`
    ///
    /// # Returns
    /// * `Err(LinkError::NotFound)` if there is no such link
    async fn compare_and_set(
        &self,
        id: &LinkId,
        expected: LinkState,
        update: StateUpdate,
    ) -> LinkResult<CasOutcome>;

    /// All links currently in `state`
    async fn list_by_state(&self, state: LinkState) -> LinkResult<Vec<PaymentLink>>;
}

/// In-memory link store for tests and single-process deployments
#[derive(Debug, Default)]
pub struct InMemoryLinkStore {
    links: RwLock<HashMap<LinkId, PaymentLink>>,
}

impl InMemoryLinkStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored links
    pub fn len(&self) -> usize {
        self.links.read().len()
    }

    /// True if no links are stored
    pub fn is_empty(&self) -> bool {
        self.links.read().is_empty()
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn insert(&self, link: PaymentLink) -> LinkResult<()> {
        let mut links = self.links.write();
        if links.contains_key(link.id()) {
            return Err(LinkError::DuplicateLink(link.id().clone()));
        }
        links.insert(link.id().clone(), link);
        Ok(())
    }

    async fn get(&self, id: &LinkId) -> LinkResult<Option<PaymentLink>> {
        Ok(self.links.read().get(id).cloned())
    }

    async fn compare_and_set(
        &self,
        id: &LinkId,
        expected: LinkState,
        update: StateUpdate,
    ) -> LinkResult<CasOutcome> {
        let mut links = self.links.write();
        let link = links
            .get_mut(id)
            .ok_or_else(|| LinkError::NotFound(id.clone()))?;

        if link.state != expected {
            return Ok(CasOutcome::Conflict(link.state));
        }

        link.state = update.state;
        link.updated_at = update.at;
        if update.clear_destination {
            link.destination = None;
        } else if let Some(destination) = update.destination {
            link.destination = Some(destination);
        }
        if let Some(reference) = update.transfer_ref {
            link.transfer_ref = Some(reference);
        }
        Ok(CasOutcome::Applied(link.clone()))
    }

    async fn list_by_state(&self, state: LinkState) -> LinkResult<Vec<PaymentLink>> {
        Ok(self
            .links
            .read()
            .values()
            .filter(|link| link.state == state)
            .cloned()
            .collect())
    }
}
