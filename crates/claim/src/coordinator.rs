use giftlock_ledger::{LedgerConnection, LedgerMsg, PlannedCall};
use giftlock_store::{GiftPackStore, StoreError};
use giftlock_types::{ClaimTask, ClaimTaskStatus, GiftPack, PackStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{ClaimError, RelayClient};

/// How a claim reference is interpreted. An all-digit reference is the
/// numeric on-chain pack id; anything else is treated as a gift code.
/// Gift codes are rejected at draft time if they are all digits, so the
/// two namespaces never overlap.
#[derive(Debug, Clone, PartialEq)]
pub enum PackLookup {
    ChainRef(u64),
    Code(String),
}

impl PackLookup {
    pub fn parse(reference: &str) -> Self {
        let trimmed = reference.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(chain_ref) = trimmed.parse() {
                return PackLookup::ChainRef(chain_ref);
            }
        }
        PackLookup::Code(trimmed.to_string())
    }
}

/// Result of building a claim.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// Submitted through the relay; completion arrives via webhook.
    Relayed { task_id: String },

    /// No relay configured: the recipient signs and submits this call
    /// themselves.
    Unsigned { call: PlannedCall },
}

/// Drives the claim flow for locked packs.
///
/// Resolution is deliberately opaque: a pack that does not exist and a
/// pack that is not currently claimable produce the same `NotFound`, so
/// the endpoint leaks nothing about which codes are live.
pub struct ClaimCoordinator {
    store: Arc<dyn GiftPackStore>,
    connection: LedgerConnection,
    relay: Option<Arc<dyn RelayClient>>,
    contract_address: String,
}

impl ClaimCoordinator {
    pub fn new(
        store: Arc<dyn GiftPackStore>,
        connection: LedgerConnection,
        relay: Option<Arc<dyn RelayClient>>,
        contract_address: impl Into<String>,
    ) -> Self {
        Self {
            store,
            connection,
            relay,
            contract_address: contract_address.into(),
        }
    }

    async fn fetch(&self, lookup: &PackLookup) -> Result<GiftPack, ClaimError> {
        match lookup {
            PackLookup::ChainRef(chain_ref) => {
                Ok(self.store.get_by_chain_ref(*chain_ref).await?)
            }
            PackLookup::Code(code) => Ok(self.store.get_by_code(code).await?),
        }
    }

    /// Resolve a claim reference to a claimable pack. Only `Locked` packs
    /// resolve; everything else is `NotFound`.
    pub async fn resolve(&self, reference: &str) -> Result<GiftPack, ClaimError> {
        let lookup = PackLookup::parse(reference);
        let pack = self.fetch(&lookup).await?;
        if pack.status != PackStatus::Locked {
            return Err(ClaimError::NotFound);
        }
        Ok(pack)
    }

    /// Build and, when a relay is configured, submit the claim call.
    ///
    /// Without a relay the encoded call is returned for the recipient's
    /// wallet to sign. With neither a relay nor a ledger connection the
    /// claim path is unavailable.
    pub async fn build_claim(&self, reference: &str) -> Result<ClaimOutcome, ClaimError> {
        if self.relay.is_none() && !self.connection.is_configured() {
            return Err(ClaimError::ClaimingDisabled);
        }

        let lookup = PackLookup::parse(reference);
        let pack = self.fetch(&lookup).await?;
        if pack.status != PackStatus::Locked {
            return Err(ClaimError::NotFound);
        }

        let code = match &lookup {
            PackLookup::Code(code) => code.clone(),
            PackLookup::ChainRef(_) => pack
                .trimmed_code()
                .ok_or(ClaimError::NotFound)?
                .to_string(),
        };

        let call = PlannedCall::new(
            &self.contract_address,
            LedgerMsg::claim_with_code(&code),
            0,
            "claim the gift pack",
        );

        match &self.relay {
            Some(relay) => {
                let task_id = relay.submit(&call).await?;
                let task = ClaimTask::new(&pack.id, &task_id, ClaimTaskStatus::Processing);
                self.store.insert_claim_task(&task).await?;
                info!(pack_id = %pack.id, task_id = %task_id, "claim submitted to relay");
                Ok(ClaimOutcome::Relayed { task_id })
            }
            None => {
                debug!(pack_id = %pack.id, "built unsigned claim call");
                Ok(ClaimOutcome::Unsigned { call })
            }
        }
    }

    /// Record a claim the recipient submitted directly, after their
    /// transaction confirmed. `external_ref` is the transaction hash.
    pub async fn confirm(
        &self,
        reference: &str,
        external_ref: &str,
    ) -> Result<ClaimTask, ClaimError> {
        let lookup = PackLookup::parse(reference);
        let pack = self.fetch(&lookup).await?;
        let task = self.store.confirm_claim(&pack.id, external_ref).await?;
        info!(pack_id = %pack.id, external_ref, "claim confirmed");
        Ok(task)
    }

    /// Latest claim attempt for a pack.
    pub async fn status(&self, reference: &str) -> Result<ClaimTask, ClaimError> {
        let lookup = PackLookup::parse(reference);
        let pack = self.fetch(&lookup).await?;
        self.store
            .latest_claim_task(&pack.id)
            .await?
            .ok_or(ClaimError::NotFound)
    }

    /// Handle the relay's completion webhook.
    ///
    /// Unknown task ids and redelivered callbacks are absorbed: webhook
    /// delivery is at-least-once, so this must be safe to call twice with
    /// the same payload. On failure the pack stays `Locked` and remains
    /// claimable; only the task record is marked.
    pub async fn on_relay_callback(
        &self,
        task_id: &str,
        succeeded: bool,
    ) -> Result<(), ClaimError> {
        let Some(task) = self.store.claim_task_by_external_ref(task_id).await? else {
            warn!(task_id, "relay callback for unknown task, dropping");
            return Ok(());
        };

        if task.is_settled() {
            debug!(task_id, "duplicate relay callback, ignoring");
            return Ok(());
        }

        if succeeded {
            match self.store.confirm_claim(&task.pack_id, task_id).await {
                Ok(_) => {
                    info!(task_id, pack_id = %task.pack_id, "relay claim confirmed");
                }
                Err(StoreError::InvalidTransition { .. }) => {
                    // The pack already settled through another path; the
                    // relay still proved its transaction landed, so the
                    // task record reflects that.
                    self.store
                        .update_claim_task(&task.id, ClaimTaskStatus::Claimed)
                        .await?;
                    debug!(task_id, "pack already claimed, settled task only");
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            self.store
                .update_claim_task(&task.id, ClaimTaskStatus::Failed)
                .await?;
            info!(task_id, pack_id = %task.pack_id, "relay claim failed, pack remains claimable");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockRelay, RelayError};
    use giftlock_ledger::MockLedger;
    use giftlock_store::InMemoryStore;
    use giftlock_types::{now_secs, GiftItem};

    struct Fixture {
        store: Arc<InMemoryStore>,
        relay: MockRelay,
        coordinator: ClaimCoordinator,
    }

    fn fixture(with_relay: bool) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let relay = MockRelay::new();
        let coordinator = ClaimCoordinator::new(
            store.clone(),
            LedgerConnection::configured(Arc::new(MockLedger::new("0xescrow"))),
            with_relay.then(|| Arc::new(relay.clone()) as Arc<dyn RelayClient>),
            "0xescrow",
        );
        Fixture {
            store,
            relay,
            coordinator,
        }
    }

    async fn seed_locked(store: &InMemoryStore, code: &str, chain_ref: u64) -> GiftPack {
        let mut pack = GiftPack::new("0xsender", None, now_secs() + 3600, Some(code.to_string()));
        pack.items.push(GiftItem::fungible("0xtoken", 10));
        store.create(&pack).await.unwrap();
        store
            .set_status(&pack.id, PackStatus::LockPending)
            .await
            .unwrap();
        store.set_status(&pack.id, PackStatus::Locked).await.unwrap();
        store.set_chain_ref(&pack.id, chain_ref).await.unwrap();
        store.get(&pack.id).await.unwrap()
    }

    #[test]
    fn test_lookup_parsing() {
        assert_eq!(PackLookup::parse("42"), PackLookup::ChainRef(42));
        assert_eq!(
            PackLookup::parse(" BDAY-2026 "),
            PackLookup::Code("BDAY-2026".to_string())
        );
        // digits with a letter are a code
        assert_eq!(
            PackLookup::parse("123a"),
            PackLookup::Code("123a".to_string())
        );
        // overflowing digit strings fall back to code lookup
        assert!(matches!(
            PackLookup::parse("99999999999999999999999999"),
            PackLookup::Code(_)
        ));
    }

    #[tokio::test]
    async fn test_resolve_by_code_and_chain_ref() {
        let fx = fixture(false);
        let pack = seed_locked(&fx.store, "GIFT-A", 7).await;

        let by_code = fx.coordinator.resolve("GIFT-A").await.unwrap();
        assert_eq!(by_code.id, pack.id);

        let by_ref = fx.coordinator.resolve("7").await.unwrap();
        assert_eq!(by_ref.id, pack.id);
    }

    #[tokio::test]
    async fn test_resolve_hides_unlocked_packs() {
        let fx = fixture(false);
        let mut pack = GiftPack::new("0xs", None, now_secs() + 3600, Some("DRAFT-1".to_string()));
        pack.items.push(GiftItem::fungible("0xt", 1));
        fx.store.create(&pack).await.unwrap();

        // draft resolves to the same error as a missing pack
        assert!(matches!(
            fx.coordinator.resolve("DRAFT-1").await,
            Err(ClaimError::NotFound)
        ));
        assert!(matches!(
            fx.coordinator.resolve("NO-SUCH").await,
            Err(ClaimError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_unsigned_claim_encodes_code() {
        let fx = fixture(false);
        seed_locked(&fx.store, "GIFT-B", 1).await;

        let outcome = fx.coordinator.build_claim("GIFT-B").await.unwrap();
        match outcome {
            ClaimOutcome::Unsigned { call } => {
                assert_eq!(call.target, "0xescrow");
                assert!(matches!(
                    call.msg,
                    LedgerMsg::ClaimWithCode { ref code, .. } if code == "GIFT-B"
                ));
            }
            other => panic!("expected unsigned outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chain_ref_claim_uses_stored_code() {
        let fx = fixture(false);
        seed_locked(&fx.store, "GIFT-C", 9).await;

        let outcome = fx.coordinator.build_claim("9").await.unwrap();
        match outcome {
            ClaimOutcome::Unsigned { call } => {
                assert!(matches!(
                    call.msg,
                    LedgerMsg::ClaimWithCode { ref code, .. } if code == "GIFT-C"
                ));
            }
            other => panic!("expected unsigned outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_relayed_claim_records_processing_task() {
        let fx = fixture(true);
        let pack = seed_locked(&fx.store, "GIFT-D", 2).await;

        let outcome = fx.coordinator.build_claim("GIFT-D").await.unwrap();
        let task_id = match outcome {
            ClaimOutcome::Relayed { task_id } => task_id,
            other => panic!("expected relayed outcome, got {other:?}"),
        };
        assert_eq!(task_id, "relay-task-0001");

        let task = fx.store.latest_claim_task(&pack.id).await.unwrap().unwrap();
        assert_eq!(task.status, ClaimTaskStatus::Processing);
        assert_eq!(task.external_ref, task_id);
        assert_eq!(fx.relay.submissions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_relay_failure_records_nothing() {
        let fx = fixture(true);
        let pack = seed_locked(&fx.store, "GIFT-E", 3).await;
        fx.relay.set_should_fail(true).await;

        let result = fx.coordinator.build_claim("GIFT-E").await;
        assert!(matches!(result, Err(ClaimError::Relay(RelayError::Http(_)))));
        assert!(fx.store.latest_claim_task(&pack.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claiming_disabled_without_relay_or_ledger() {
        let store = Arc::new(InMemoryStore::new());
        let coordinator = ClaimCoordinator::new(
            store.clone(),
            LedgerConnection::disabled(),
            None,
            "0xescrow",
        );
        seed_locked(&store, "GIFT-F", 4).await;

        let result = coordinator.build_claim("GIFT-F").await;
        assert!(matches!(result, Err(ClaimError::ClaimingDisabled)));
    }

    #[tokio::test]
    async fn test_confirm_moves_pack_to_claimed_once() {
        let fx = fixture(false);
        let pack = seed_locked(&fx.store, "GIFT-G", 5).await;

        let task = fx.coordinator.confirm("GIFT-G", "0xtxhash").await.unwrap();
        assert_eq!(task.status, ClaimTaskStatus::Claimed);
        assert_eq!(
            fx.store.get(&pack.id).await.unwrap().status,
            PackStatus::Claimed
        );

        // claimed packs no longer resolve
        assert!(matches!(
            fx.coordinator.resolve("GIFT-G").await,
            Err(ClaimError::NotFound)
        ));
        // a second confirmation is rejected with the pack's real state
        assert!(matches!(
            fx.coordinator.confirm("GIFT-G", "0xother").await,
            Err(ClaimError::InvalidState { status: PackStatus::Claimed, .. })
        ));
    }

    #[tokio::test]
    async fn test_status_reports_latest_attempt() {
        let fx = fixture(true);
        seed_locked(&fx.store, "GIFT-H", 6).await;

        assert!(matches!(
            fx.coordinator.status("GIFT-H").await,
            Err(ClaimError::NotFound)
        ));

        fx.coordinator.build_claim("GIFT-H").await.unwrap();
        let task = fx.coordinator.status("GIFT-H").await.unwrap();
        assert_eq!(task.status, ClaimTaskStatus::Processing);
    }

    #[tokio::test]
    async fn test_callback_success_settles_pack_and_task() {
        let fx = fixture(true);
        let pack = seed_locked(&fx.store, "GIFT-I", 8).await;
        fx.coordinator.build_claim("GIFT-I").await.unwrap();

        fx.coordinator
            .on_relay_callback("relay-task-0001", true)
            .await
            .unwrap();

        assert_eq!(
            fx.store.get(&pack.id).await.unwrap().status,
            PackStatus::Claimed
        );
        let task = fx.store.latest_claim_task(&pack.id).await.unwrap().unwrap();
        assert_eq!(task.status, ClaimTaskStatus::Claimed);

        // redelivery is a no-op
        fx.coordinator
            .on_relay_callback("relay-task-0001", true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_callback_failure_keeps_pack_claimable() {
        let fx = fixture(true);
        let pack = seed_locked(&fx.store, "GIFT-J", 10).await;
        fx.coordinator.build_claim("GIFT-J").await.unwrap();

        fx.coordinator
            .on_relay_callback("relay-task-0001", false)
            .await
            .unwrap();

        assert_eq!(
            fx.store.get(&pack.id).await.unwrap().status,
            PackStatus::Locked
        );
        let task = fx.store.latest_claim_task(&pack.id).await.unwrap().unwrap();
        assert_eq!(task.status, ClaimTaskStatus::Failed);

        // the pack can be claimed again after a failed relay attempt
        let outcome = fx.coordinator.build_claim("GIFT-J").await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::Relayed { .. }));
    }

    #[tokio::test]
    async fn test_callback_unknown_task_is_absorbed() {
        let fx = fixture(true);
        fx.coordinator
            .on_relay_callback("relay-task-9999", true)
            .await
            .unwrap();
    }
}
