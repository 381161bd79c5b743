use async_trait::async_trait;
use giftlock_types::{ClaimTask, ClaimTaskStatus, GiftItem, GiftPack, PackStatus};

use crate::StoreError;

/// Partial metadata update for a draft pack. `None` fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct DraftUpdate {
    pub message: Option<String>,
    pub expires_at: Option<u64>,
    pub gift_code: Option<String>,
}

/// Storage for gift packs and their claim attempt records.
///
/// The off-chain pack row is the only mutable shared resource in the
/// system; implementations must apply each transition as a single atomic
/// write so a concurrent reader never observes a half-applied state. In
/// particular `confirm_claim` couples the claim task insert and the pack's
/// move to `Claimed` into one unit, and it is the mutual-exclusion point
/// for racing claim confirmations.
#[async_trait]
pub trait GiftPackStore: Send + Sync {
    /// Store a new pack. Fails with `CodeConflict` if another pack already
    /// uses the same (trimmed) gift code, `DuplicateId` on id reuse.
    async fn create(&self, pack: &GiftPack) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<GiftPack, StoreError>;

    /// Look up by secret code (edge-trimmed before comparison).
    async fn get_by_code(&self, code: &str) -> Result<GiftPack, StoreError>;

    /// Look up by on-chain pack id.
    async fn get_by_chain_ref(&self, chain_ref: u64) -> Result<GiftPack, StoreError>;

    /// Update draft metadata. Fails with `NotDraft` outside `Draft`, and
    /// with `CodeConflict` if a new gift code collides.
    async fn update_draft(&self, id: &str, update: DraftUpdate) -> Result<GiftPack, StoreError>;

    /// Delete a pack; allowed only while `Draft`.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Append an item; the item is shape-validated first. Draft only.
    async fn add_item(&self, id: &str, item: GiftItem) -> Result<GiftPack, StoreError>;

    /// Remove the item at `index`. Draft only.
    async fn remove_item(&self, id: &str, index: usize) -> Result<GiftPack, StoreError>;

    /// Move the pack to `status`, enforcing the legal transition edges.
    async fn set_status(&self, id: &str, status: PackStatus) -> Result<(), StoreError>;

    /// Record the on-chain pack id once the create step is observed.
    async fn set_chain_ref(&self, id: &str, chain_ref: u64) -> Result<(), StoreError>;

    async fn list_by_status(
        &self,
        status: PackStatus,
        limit: usize,
    ) -> Result<Vec<GiftPack>, StoreError>;

    /// Delete `Draft` packs created before `cutoff`; returns the count.
    async fn purge_stale_drafts(&self, cutoff: u64) -> Result<usize, StoreError>;

    /// Atomically record a confirmed claim: requires the pack to be
    /// `Locked`, inserts a `Claimed` task, and moves the pack to `Claimed`
    /// in the same unit. A second call for the same pack fails with
    /// `InvalidTransition` and mutates nothing.
    async fn confirm_claim(
        &self,
        pack_id: &str,
        external_ref: &str,
    ) -> Result<ClaimTask, StoreError>;

    async fn insert_claim_task(&self, task: &ClaimTask) -> Result<(), StoreError>;

    async fn update_claim_task(
        &self,
        task_id: &str,
        status: ClaimTaskStatus,
    ) -> Result<ClaimTask, StoreError>;

    /// Most recently created claim task for the pack, if any.
    async fn latest_claim_task(&self, pack_id: &str) -> Result<Option<ClaimTask>, StoreError>;

    /// Find a task by its relay task id or transaction hash.
    async fn claim_task_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<ClaimTask>, StoreError>;
}
