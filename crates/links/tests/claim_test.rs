//! Concurrent claim and lifecycle tests for the transfer coordinator

use async_trait::async_trait;
use splitvault_links::{
    DelegatedTransferCoordinator, ExecutorError, InMemoryLinkStore, LinkError, LinkStore,
    ManualClock, NewLink, OneTimeCodeCodec, RefundRequest, SettlementResolution, TransferExecutor,
    TransferReceipt, TransferRequest,
};
use splitvault_types::{Amount, LinkId, LinkState, TimestampMillis};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const START: TimestampMillis = TimestampMillis::new(1_700_000_000_000);

/// Executor that takes a while, so racing claims overlap
struct SlowExecutor {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowExecutor {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TransferExecutor for SlowExecutor {
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(TransferReceipt {
            reference: format!("0xtx-{}", request.link_id),
        })
    }

    async fn refund(&self, request: &RefundRequest) -> Result<TransferReceipt, ExecutorError> {
        Ok(TransferReceipt {
            reference: format!("0xrefund-{}", request.link_id),
        })
    }
}

fn coordinator(
    executor: Arc<SlowExecutor>,
    store: Arc<InMemoryLinkStore>,
    clock: Arc<ManualClock>,
    timeout: Duration,
) -> DelegatedTransferCoordinator {
    let codec = OneTimeCodeCodec::new(b"splitvault-test-deployment-secret".to_vec()).unwrap();
    DelegatedTransferCoordinator::new(
        store,
        executor,
        Arc::new(codec),
        Duration::from_secs(24 * 3600),
        timeout,
    )
    .with_clock(clock)
}

fn link(id: &str, per_link_key: bool) -> NewLink {
    NewLink {
        id: LinkId::new(id).unwrap(),
        creator: "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".into(),
        asset: "SOL".into(),
        amount: Amount::new("10.50").unwrap(),
        ttl: None,
        per_link_key,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_settle_exactly_once() {
    let executor = Arc::new(SlowExecutor::new(Duration::from_millis(50)));
    let store = Arc::new(InMemoryLinkStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let coordinator = Arc::new(coordinator(
        executor.clone(),
        store.clone(),
        clock,
        Duration::from_secs(5),
    ));

    let created = coordinator.create_link(link("pl_race", false)).await.unwrap();
    let id = created.link.id().clone();
    let code = created.code.code.clone();

    let mut handles = Vec::new();
    for i in 0..8 {
        let coordinator = coordinator.clone();
        let id = id.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            coordinator.claim(&id, &code, &format!("dest-{i}")).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LinkError::AlreadyClaimed) => {}
            Err(other) => panic!("unexpected claim error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

    let stored = store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.state, LinkState::Claimed);
    assert_eq!(stored.transfer_ref.as_deref(), Some("0xtx-pl_race"));
}

#[tokio::test]
async fn test_timeout_holds_reservation() {
    let executor = Arc::new(SlowExecutor::new(Duration::from_millis(200)));
    let store = Arc::new(InMemoryLinkStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let coordinator = coordinator(executor.clone(), store, clock, Duration::from_millis(20));

    let created = coordinator.create_link(link("pl_slow", false)).await.unwrap();
    let id = created.link.id().clone();

    let err = coordinator
        .claim(&id, &created.code.code, "dest-a")
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::TransferExecutionFailed(_)));

    let held = coordinator.get(&id).await.unwrap();
    assert_eq!(held.state, LinkState::Settling);
    assert_eq!(held.destination.as_deref(), Some("dest-a"));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_after_timeout_does_not_transfer_twice() {
    let executor = Arc::new(SlowExecutor::new(Duration::from_millis(200)));
    let store = Arc::new(InMemoryLinkStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let coordinator = coordinator(executor.clone(), store, clock, Duration::from_millis(20));

    let created = coordinator.create_link(link("pl_retry", false)).await.unwrap();
    let id = created.link.id().clone();
    let code = created.code.code.clone();

    assert!(coordinator.claim(&id, &code, "dest-a").await.is_err());
    let err = coordinator.claim(&id, &code, "dest-b").await.unwrap_err();
    assert!(matches!(err, LinkError::AlreadyClaimed));
    assert!(matches!(
        coordinator.cancel(&id).await,
        Err(LinkError::AlreadyClaimed)
    ));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

    // The relayer did carry out the first transfer
    let claimed = coordinator
        .reconcile(&id, SettlementResolution::Executed("0xtx-pl_retry".into()))
        .await
        .unwrap();
    assert_eq!(claimed.state, LinkState::Claimed);
    assert_eq!(claimed.destination.as_deref(), Some("dest-a"));
    assert_eq!(claimed.transfer_ref.as_deref(), Some("0xtx-pl_retry"));

    let err = coordinator.claim(&id, &code, "dest-b").await.unwrap_err();
    assert!(matches!(err, LinkError::AlreadyClaimed));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reconcile_not_executed_reopens_link() {
    let slow = Arc::new(SlowExecutor::new(Duration::from_millis(200)));
    let store = Arc::new(InMemoryLinkStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let first = coordinator(slow, store.clone(), clock.clone(), Duration::from_millis(20));

    let created = first.create_link(link("pl_lost", false)).await.unwrap();
    let id = created.link.id().clone();
    assert!(first.claim(&id, &created.code.code, "dest-a").await.is_err());

    let reopened = first
        .reconcile(&id, SettlementResolution::NotExecuted)
        .await
        .unwrap();
    assert_eq!(reopened.state, LinkState::Active);
    assert_eq!(reopened.destination, None);

    let fast = Arc::new(SlowExecutor::new(Duration::ZERO));
    let second = coordinator(fast.clone(), store, clock, Duration::from_secs(5));
    let receipt = second
        .claim(&id, &created.code.code, "dest-b")
        .await
        .unwrap();
    assert_eq!(receipt.destination, "dest-b");
    assert_eq!(fast.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_expire_stale_sweep() {
    let executor = Arc::new(SlowExecutor::new(Duration::ZERO));
    let store = Arc::new(InMemoryLinkStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let coordinator = coordinator(executor, store, clock.clone(), Duration::from_secs(5));

    let mut short = link("pl_short", false);
    short.ttl = Some(Duration::from_secs(60));
    coordinator.create_link(short).await.unwrap();
    coordinator.create_link(link("pl_long", false)).await.unwrap();

    clock.advance(Duration::from_secs(61));
    let expired = coordinator.expire_stale().await.unwrap();
    assert_eq!(expired, vec![LinkId::new("pl_short").unwrap()]);

    let short = coordinator.get(&LinkId::new("pl_short").unwrap()).await.unwrap();
    assert_eq!(short.state, LinkState::Expired);
    let long = coordinator.get(&LinkId::new("pl_long").unwrap()).await.unwrap();
    assert_eq!(long.state, LinkState::Active);

    // Nothing left to sweep
    assert!(coordinator.expire_stale().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_per_link_key_claim() {
    let executor = Arc::new(SlowExecutor::new(Duration::ZERO));
    let store = Arc::new(InMemoryLinkStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let coordinator = coordinator(executor, store, clock, Duration::from_secs(5));

    let created = coordinator.create_link(link("pl_keyed", true)).await.unwrap();
    assert!(created.link.otc.link_key.is_some());

    // The deployment-secret code for the same triple is not the link's code
    let global = coordinator
        .codec()
        .generate(created.link.id(), created.link.amount(), created.link.created_at())
        .unwrap();
    if global.code != created.code.code {
        let err = coordinator
            .claim(created.link.id(), &global.code, "dest")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::OtpMismatch));
    }

    coordinator
        .claim(created.link.id(), &created.code.code, "dest")
        .await
        .unwrap();
}
