use std::sync::Arc;
use std::time::Duration;

use giftlock_claim::{ClaimCoordinator, ClaimOutcome, RelayClient};
use giftlock_config::PurgeSettings;
use giftlock_ledger::{ChainStatus, LedgerConnection, StatusReconciler};
use giftlock_orchestrator::{
    LockOrchestrator, LockPlan, ValidationIssue, ValidationReport,
};
use giftlock_store::{DraftSweeper, DraftUpdate, GiftPackStore, SweeperConfig};
use giftlock_types::{now_secs, ClaimTask, GiftItem, GiftPack};
use tracing::info;

use crate::GiftlockError;

/// Facade over the draft store, lock orchestrator, claim coordinator, and
/// status reconciler. One instance serves the whole API surface; all
/// methods take `&self` and are safe to call concurrently.
pub struct GiftPackService {
    store: Arc<dyn GiftPackStore>,
    orchestrator: LockOrchestrator,
    claims: ClaimCoordinator,
    reconciler: StatusReconciler,
    sweeper_config: SweeperConfig,
}

impl GiftPackService {
    pub fn new(
        store: Arc<dyn GiftPackStore>,
        connection: LedgerConnection,
        relay: Option<Arc<dyn RelayClient>>,
        contract_address: impl Into<String>,
    ) -> Self {
        let contract_address = contract_address.into();
        Self {
            orchestrator: LockOrchestrator::new(
                store.clone(),
                connection.clone(),
                contract_address.clone(),
            ),
            claims: ClaimCoordinator::new(store.clone(), connection.clone(), relay, contract_address),
            reconciler: StatusReconciler::new(connection),
            store,
            sweeper_config: SweeperConfig::default(),
        }
    }

    pub fn with_purge_settings(mut self, purge: &PurgeSettings) -> Self {
        self.sweeper_config = SweeperConfig {
            interval: Duration::from_secs(purge.interval_secs),
            retention: Duration::from_secs(purge.retention_secs),
        };
        self
    }

    // ═══════════════════════════ Draft lifecycle ═══════════════════════════

    /// Create a new draft pack. All-digit gift codes are rejected here so
    /// the claim lookup can always tell a code from a numeric on-chain id.
    pub async fn create_draft(
        &self,
        sender: impl Into<String>,
        message: Option<String>,
        expires_at: u64,
        gift_code: Option<String>,
    ) -> Result<GiftPack, GiftlockError> {
        reject_numeric_code(gift_code.as_deref())?;
        let pack = GiftPack::new(sender, message, expires_at, gift_code);
        self.store.create(&pack).await?;
        info!(pack_id = %pack.id, "draft created");
        Ok(pack)
    }

    pub async fn get_pack(&self, id: &str) -> Result<GiftPack, GiftlockError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn update_draft(
        &self,
        id: &str,
        update: DraftUpdate,
    ) -> Result<GiftPack, GiftlockError> {
        reject_numeric_code(update.gift_code.as_deref())?;
        Ok(self.store.update_draft(id, update).await?)
    }

    pub async fn delete_draft(&self, id: &str) -> Result<(), GiftlockError> {
        self.store.delete(id).await?;
        info!(pack_id = id, "draft deleted");
        Ok(())
    }

    pub async fn add_item(&self, id: &str, item: GiftItem) -> Result<GiftPack, GiftlockError> {
        Ok(self.store.add_item(id, item).await?)
    }

    pub async fn remove_item(&self, id: &str, index: usize) -> Result<GiftPack, GiftlockError> {
        Ok(self.store.remove_item(id, index).await?)
    }

    // ═══════════════════════════ Locking ═══════════════════════════

    /// Check lock preconditions without side effects.
    pub async fn validate(&self, id: &str) -> Result<ValidationReport, GiftlockError> {
        Ok(self.orchestrator.validate(id, now_secs()).await?)
    }

    /// Build the ordered call plan for the sender's wallet, resuming from
    /// on-chain progress. Moves the pack to `LockPending` on first success.
    pub async fn generate_lock_plan(&self, id: &str) -> Result<LockPlan, GiftlockError> {
        Ok(self.orchestrator.generate_plan(id, now_secs()).await?)
    }

    /// Promote a `LockPending` pack to `Locked` once the ledger confirms
    /// the terminal lock step.
    pub async fn confirm_lock(&self, id: &str) -> Result<GiftPack, GiftlockError> {
        Ok(self.reconciler.confirm_lock(self.store.as_ref(), id).await?)
    }

    /// Advisory on-chain status for a pack that has an on-chain reference.
    pub async fn chain_status(&self, id: &str) -> Result<ChainStatus, GiftlockError> {
        let pack = self.store.get(id).await?;
        let chain_ref = pack.chain_ref.ok_or_else(|| {
            GiftlockError::BadRequest(format!("pack {id} has no on-chain reference"))
        })?;
        Ok(self.reconciler.chain_status(chain_ref, now_secs()).await?)
    }

    // ═══════════════════════════ Claiming ═══════════════════════════

    /// Resolve a gift code or numeric on-chain id to a claimable pack.
    pub async fn resolve_claim(&self, reference: &str) -> Result<GiftPack, GiftlockError> {
        Ok(self.claims.resolve(reference).await?)
    }

    /// Build and, with a relay configured, submit the claim.
    pub async fn submit_claim(&self, reference: &str) -> Result<ClaimOutcome, GiftlockError> {
        Ok(self.claims.build_claim(reference).await?)
    }

    /// Record a directly-submitted claim after its transaction confirmed.
    pub async fn confirm_claim(
        &self,
        reference: &str,
        tx_hash: &str,
    ) -> Result<ClaimTask, GiftlockError> {
        Ok(self.claims.confirm(reference, tx_hash).await?)
    }

    pub async fn claim_status(&self, reference: &str) -> Result<ClaimTask, GiftlockError> {
        Ok(self.claims.status(reference).await?)
    }

    /// Relay completion webhook. Idempotent; unknown tasks are absorbed.
    pub async fn relay_callback(
        &self,
        task_id: &str,
        succeeded: bool,
    ) -> Result<(), GiftlockError> {
        Ok(self.claims.on_relay_callback(task_id, succeeded).await?)
    }

    // ═══════════════════════════ Maintenance ═══════════════════════════

    /// Start the periodic stale-draft purge on the current runtime.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        DraftSweeper::new(self.store.clone(), self.sweeper_config.clone()).spawn()
    }
}

fn reject_numeric_code(code: Option<&str>) -> Result<(), GiftlockError> {
    if let Some(code) = code {
        let trimmed = code.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(GiftlockError::Validation(ValidationReport {
                errors: vec![ValidationIssue::NumericGiftCode],
            }));
        }
    }
    Ok(())
}
