use giftlock_ledger::{LedgerConnection, LedgerMsg, LockProgress, PlannedCall};
use giftlock_store::GiftPackStore;
use giftlock_types::{CodeHash, GiftItem, GiftPack, PackStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{DraftValidator, PlanError, ValidationReport};

/// Ordered, replayable sequence of ledger calls that establishes and locks
/// a pack on-chain. Executed by the sender's wallet, never by this service.
#[derive(Debug, Clone, Serialize)]
pub struct LockPlan {
    pub pack_id: String,
    pub code_hash: String,
    pub steps: Vec<PlannedCall>,
}

/// Turns a draft pack into a lock plan.
///
/// The service deliberately never signs or submits these calls: execution
/// stays with the sender's wallet so the backend holds no approval rights
/// over sender assets. The orchestrator's contract is to make the plan
/// safe to regenerate after partial failure: already-confirmed steps are
/// detected on-chain by code hash and skipped.
pub struct LockOrchestrator {
    store: Arc<dyn GiftPackStore>,
    connection: LedgerConnection,
    contract_address: String,
    validator: DraftValidator,
}

impl LockOrchestrator {
    pub fn new(
        store: Arc<dyn GiftPackStore>,
        connection: LedgerConnection,
        contract_address: impl Into<String>,
    ) -> Self {
        Self {
            store,
            connection,
            contract_address: contract_address.into(),
            validator: DraftValidator::new(),
        }
    }

    /// Check a pack against the lock preconditions without side effects.
    pub async fn validate(
        &self,
        pack_id: &str,
        current_time: u64,
    ) -> Result<ValidationReport, PlanError> {
        let pack = self.store.get(pack_id).await?;
        Ok(self.validator.validate(&pack, current_time))
    }

    /// Build the lock plan for a pack, resuming from on-chain progress.
    ///
    /// On first success the pack moves `Draft -> LockPending`; it becomes
    /// `Locked` only once the reconciler observes the terminal step
    /// confirmed. Regeneration from `LockPending` is legal and yields only
    /// the steps the ledger has not seen yet.
    pub async fn generate_plan(
        &self,
        pack_id: &str,
        current_time: u64,
    ) -> Result<LockPlan, PlanError> {
        let pack = self.store.get(pack_id).await?;

        let report = self.validator.validate(&pack, current_time);
        if !report.is_valid() {
            return Err(PlanError::Validation(report));
        }

        // validate() guarantees a usable code at this point
        let code = pack.trimmed_code().ok_or_else(|| {
            PlanError::Validation(ValidationReport {
                errors: vec![crate::ValidationIssue::MissingGiftCode],
            })
        })?;
        let code_hash = CodeHash::of(code);

        let progress = self.on_chain_progress(&code_hash).await?;
        if progress.locked {
            return Err(PlanError::AlreadyLocked);
        }

        let steps = self.build_steps(&pack, &code_hash, &progress);
        debug!(
            pack_id,
            code_hash = %code_hash,
            skipped_create = progress.created,
            skipped_attaches = progress.attached_count,
            steps = steps.len(),
            "lock plan generated"
        );

        if pack.status == PackStatus::Draft {
            self.store
                .set_status(pack_id, PackStatus::LockPending)
                .await?;
            info!(pack_id, "pack moved to lock_pending");
        }

        Ok(LockPlan {
            pack_id: pack.id,
            code_hash: code_hash.to_hex(),
            steps,
        })
    }

    /// Probe the ledger for already-confirmed steps. A disabled connection
    /// plans from step zero: there is nothing to resume against, and the
    /// contract itself rejects duplicate creates.
    async fn on_chain_progress(&self, code_hash: &CodeHash) -> Result<LockProgress, PlanError> {
        match &self.connection {
            LedgerConnection::Configured(ledger) => {
                Ok(ledger.lock_progress(code_hash).await?)
            }
            LedgerConnection::Disabled => Ok(LockProgress::default()),
        }
    }

    fn build_steps(
        &self,
        pack: &GiftPack,
        code_hash: &CodeHash,
        progress: &LockProgress,
    ) -> Vec<PlannedCall> {
        let mut steps = Vec::with_capacity(pack.items.len() + 2);

        if !progress.created {
            steps.push(PlannedCall::new(
                &self.contract_address,
                LedgerMsg::create_pack(code_hash, pack.expires_at, pack.message.clone()),
                0,
                "create the gift pack escrow entry",
            ));
        }

        for (index, item) in pack.items.iter().enumerate().skip(progress.attached_count) {
            steps.push(PlannedCall::new(
                &self.contract_address,
                LedgerMsg::attach_asset(code_hash, item),
                native_value(item),
                format!("attach asset {} of {}", index + 1, pack.items.len()),
            ));
        }

        steps.push(PlannedCall::new(
            &self.contract_address,
            LedgerMsg::lock_pack(code_hash),
            0,
            "lock the pack for claiming",
        ));

        steps
    }
}

/// Native deposits carry their amount as call value; token transfers move
/// through the token contract instead.
fn native_value(item: &GiftItem) -> u128 {
    if item.is_native() {
        item.amount.unwrap_or(0)
    } else {
        0
    }
}
