use std::sync::Arc;

use giftlock::{
    ChainStatus, ClaimOutcome, EscrowLedger, GiftItem, GiftPackService, GiftlockError,
    LedgerConnection, LedgerError, LedgerFault, MockLedger, MockRelay, PackStatus, RelayClient,
    now_secs,
};

struct Harness {
    ledger: MockLedger,
    relay: MockRelay,
    service: GiftPackService,
}

fn harness(with_relay: bool) -> Harness {
    let ledger = MockLedger::new("0xescrow");
    let relay = MockRelay::new();
    let service = GiftPackService::new(
        Arc::new(giftlock::InMemoryStore::new()),
        LedgerConnection::configured(Arc::new(ledger.clone())),
        with_relay.then(|| Arc::new(relay.clone()) as Arc<dyn RelayClient>),
        "0xescrow",
    );
    Harness {
        ledger,
        relay,
        service,
    }
}

async fn compose_draft(service: &GiftPackService, code: &str) -> String {
    let pack = service
        .create_draft(
            "0xsender",
            Some("enjoy!".to_string()),
            now_secs() + 3600,
            Some(code.to_string()),
        )
        .await
        .unwrap();
    service
        .add_item(&pack.id, GiftItem::fungible("0xtoken", 100))
        .await
        .unwrap();
    pack.id
}

// ═══════════════════════════════════════════════════════════════════════════
// FULL LIFECYCLE: DRAFT -> LOCK -> CLAIM
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_full_lifecycle_with_unsigned_claim() {
    let h = harness(false);
    let pack_id = compose_draft(&h.service, "PARTY-2026").await;

    // Plan: create, attach, lock
    let plan = h.service.generate_lock_plan(&pack_id).await.unwrap();
    assert_eq!(plan.steps.len(), 3);
    assert_eq!(
        h.service.get_pack(&pack_id).await.unwrap().status,
        PackStatus::LockPending
    );

    // The sender's wallet executes every step
    for step in &plan.steps {
        h.ledger.execute(step, "0xsender").await.unwrap();
    }

    let locked = h.service.confirm_lock(&pack_id).await.unwrap();
    assert_eq!(locked.status, PackStatus::Locked);
    let chain_ref = locked.chain_ref.unwrap();

    // The recipient resolves by code and gets an unsigned claim call
    let resolved = h.service.resolve_claim("PARTY-2026").await.unwrap();
    assert_eq!(resolved.id, pack_id);

    let outcome = h.service.submit_claim("PARTY-2026").await.unwrap();
    let call = match outcome {
        ClaimOutcome::Unsigned { call } => call,
        other => panic!("expected unsigned claim, got {other:?}"),
    };

    // They sign and submit it themselves, then report the transaction
    let tx_hash = h.ledger.execute(&call, "0xrecipient").await.unwrap();
    let task = h.service.confirm_claim("PARTY-2026", &tx_hash).await.unwrap();
    assert!(task.is_settled());

    let claimed = h.service.get_pack(&pack_id).await.unwrap();
    assert_eq!(claimed.status, PackStatus::Claimed);

    // On-chain view agrees
    assert_eq!(
        h.service.chain_status(&pack_id).await.unwrap(),
        ChainStatus::Claimed
    );
    // and a second claim attempt resolves to nothing
    assert!(matches!(
        h.service.resolve_claim("PARTY-2026").await,
        Err(GiftlockError::NotFound)
    ));
    assert!(matches!(
        h.service.resolve_claim(&chain_ref.to_string()).await,
        Err(GiftlockError::NotFound)
    ));
}

#[tokio::test]
async fn test_claim_by_chain_reference() {
    let h = harness(false);
    let pack_id = compose_draft(&h.service, "REF-CLAIM").await;

    let plan = h.service.generate_lock_plan(&pack_id).await.unwrap();
    for step in &plan.steps {
        h.ledger.execute(step, "0xsender").await.unwrap();
    }
    let locked = h.service.confirm_lock(&pack_id).await.unwrap();
    let chain_ref = locked.chain_ref.unwrap();

    // An all-digit reference is the on-chain id, not a code
    let resolved = h
        .service
        .resolve_claim(&chain_ref.to_string())
        .await
        .unwrap();
    assert_eq!(resolved.id, pack_id);
}

// ═══════════════════════════════════════════════════════════════════════════
// IDEMPOTENT LOCK PLAN RESUMPTION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_plan_resumes_after_partial_wallet_failure() {
    let h = harness(false);
    let pack_id = compose_draft(&h.service, "RESUME-1").await;
    h.service
        .add_item(&pack_id, GiftItem::non_fungible("0xnft", 3))
        .await
        .unwrap();

    let plan = h.service.generate_lock_plan(&pack_id).await.unwrap();
    assert_eq!(plan.steps.len(), 4);

    // Wallet dies after create + first attach
    for step in &plan.steps[..2] {
        h.ledger.execute(step, "0xsender").await.unwrap();
    }
    assert!(h.service.confirm_lock(&pack_id).await.is_err());

    // Regenerated plan holds only the unconfirmed steps
    let resumed = h.service.generate_lock_plan(&pack_id).await.unwrap();
    assert_eq!(resumed.steps.len(), 2);
    for step in &resumed.steps {
        h.ledger.execute(step, "0xsender").await.unwrap();
    }

    let locked = h.service.confirm_lock(&pack_id).await.unwrap();
    assert_eq!(locked.status, PackStatus::Locked);
}

#[tokio::test]
async fn test_items_frozen_once_plan_is_out() {
    let h = harness(false);
    let pack_id = compose_draft(&h.service, "FROZEN-1").await;

    h.service.generate_lock_plan(&pack_id).await.unwrap();

    let result = h
        .service
        .add_item(&pack_id, GiftItem::fungible("0xother", 1))
        .await;
    assert!(matches!(result, Err(GiftlockError::BadRequest(_))));
}

// ═══════════════════════════════════════════════════════════════════════════
// RELAYED CLAIMS AND WEBHOOK CALLBACKS
// ═══════════════════════════════════════════════════════════════════════════

async fn locked_pack(h: &Harness, code: &str) -> String {
    let pack_id = compose_draft(&h.service, code).await;
    let plan = h.service.generate_lock_plan(&pack_id).await.unwrap();
    for step in &plan.steps {
        h.ledger.execute(step, "0xsender").await.unwrap();
    }
    h.service.confirm_lock(&pack_id).await.unwrap();
    pack_id
}

#[tokio::test]
async fn test_relayed_claim_settles_through_callback() {
    let h = harness(true);
    let pack_id = locked_pack(&h, "RELAY-OK").await;

    let outcome = h.service.submit_claim("RELAY-OK").await.unwrap();
    let task_id = match outcome {
        ClaimOutcome::Relayed { task_id } => task_id,
        other => panic!("expected relayed claim, got {other:?}"),
    };
    assert_eq!(h.relay.submissions().await.len(), 1);

    h.service.relay_callback(&task_id, true).await.unwrap();
    assert_eq!(
        h.service.get_pack(&pack_id).await.unwrap().status,
        PackStatus::Claimed
    );

    // Webhook redelivery changes nothing
    h.service.relay_callback(&task_id, true).await.unwrap();
    assert_eq!(
        h.service.get_pack(&pack_id).await.unwrap().status,
        PackStatus::Claimed
    );
}

#[tokio::test]
async fn test_failed_relay_claim_leaves_pack_claimable() {
    let h = harness(true);
    let pack_id = locked_pack(&h, "RELAY-FAIL").await;

    let ClaimOutcome::Relayed { task_id } = h.service.submit_claim("RELAY-FAIL").await.unwrap()
    else {
        panic!("expected relayed claim");
    };

    h.service.relay_callback(&task_id, false).await.unwrap();
    assert_eq!(
        h.service.get_pack(&pack_id).await.unwrap().status,
        PackStatus::Locked
    );

    // The recipient simply tries again
    let retry = h.service.submit_claim("RELAY-FAIL").await.unwrap();
    let ClaimOutcome::Relayed { task_id: retry_id } = retry else {
        panic!("expected relayed claim");
    };
    h.service.relay_callback(&retry_id, true).await.unwrap();
    assert_eq!(
        h.service.get_pack(&pack_id).await.unwrap().status,
        PackStatus::Claimed
    );
}

#[tokio::test]
async fn test_callback_for_unknown_task_is_ignored() {
    let h = harness(true);
    h.service.relay_callback("no-such-task", true).await.unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTRACT GATES AND ERROR CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_paused_contract_surfaces_typed_fault() {
    let h = harness(false);
    let pack_id = compose_draft(&h.service, "PAUSE-1").await;
    h.ledger.set_paused(true).await;

    let err = h.service.generate_lock_plan(&pack_id).await.unwrap_err();
    assert_eq!(err.fault(), Some(LedgerFault::Paused));

    // Nothing moved: the pack is still an editable draft
    assert_eq!(
        h.service.get_pack(&pack_id).await.unwrap().status,
        PackStatus::Draft
    );
}

#[tokio::test]
async fn test_closed_active_window_surfaces_typed_fault() {
    let h = harness(false);
    let pack_id = compose_draft(&h.service, "WINDOW-1").await;
    h.ledger.set_active_until(Some(now_secs() - 60)).await;

    let err = h.service.generate_lock_plan(&pack_id).await.unwrap_err();
    assert_eq!(err.fault(), Some(LedgerFault::InactiveWindow));
}

#[tokio::test]
async fn test_expired_pack_claim_reverts_on_chain() {
    let h = harness(false);
    let pack_id = compose_draft(&h.service, "EXPIRE-1").await;

    let plan = h.service.generate_lock_plan(&pack_id).await.unwrap();
    for step in &plan.steps {
        h.ledger.execute(step, "0xsender").await.unwrap();
    }
    h.service.confirm_lock(&pack_id).await.unwrap();

    // Time passes on-chain
    let outcome = h.service.submit_claim("EXPIRE-1").await.unwrap();
    let ClaimOutcome::Unsigned { call } = outcome else {
        panic!("expected unsigned claim");
    };
    h.ledger.expire_pack("EXPIRE-1").await;

    let result = h.ledger.execute(&call, "0xrecipient").await;
    assert!(matches!(result, Err(LedgerError::Reverted(_))));

    // The off-chain cache still says locked; the advisory chain status
    // reports the expiry
    assert_eq!(
        h.service.chain_status(&pack_id).await.unwrap(),
        ChainStatus::Expired
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// DRAFT-ONLY MODE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_disabled_ledger_still_drafts_and_plans() {
    let service = GiftPackService::new(
        Arc::new(giftlock::InMemoryStore::new()),
        LedgerConnection::disabled(),
        None,
        "0xescrow",
    );

    let pack_id = compose_draft(&service, "OFFLINE-1").await;
    let plan = service.generate_lock_plan(&pack_id).await.unwrap();
    assert_eq!(plan.steps.len(), 3);

    // lock confirmation and claiming need connectivity
    let err = service.confirm_lock(&pack_id).await.unwrap_err();
    assert!(matches!(err, GiftlockError::ServiceUnavailable(_)));
    assert!(matches!(
        service.submit_claim("OFFLINE-1").await,
        Err(GiftlockError::ServiceUnavailable(_))
    ));
}
