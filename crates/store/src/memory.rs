use async_trait::async_trait;
use giftlock_types::{
    now_secs, ClaimTask, ClaimTaskStatus, GiftItem, GiftPack, PackStatus,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{DraftUpdate, GiftPackStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    packs: HashMap<String, GiftPack>,
    /// trimmed gift code -> pack id
    code_index: HashMap<String, String>,
    tasks: HashMap<String, ClaimTask>,
}

/// In-memory store backed by a single lock, so every transition is one
/// atomic write. Primary backend for tests; also usable for ephemeral
/// deployments.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored packs (for testing)
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().packs.is_empty()
    }
}

fn trimmed(code: &str) -> String {
    code.trim().to_string()
}

#[async_trait]
impl GiftPackStore for InMemoryStore {
    async fn create(&self, pack: &GiftPack) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if inner.packs.contains_key(&pack.id) {
            return Err(StoreError::DuplicateId(pack.id.clone()));
        }
        if let Some(code) = pack.trimmed_code() {
            if inner.code_index.contains_key(code) {
                return Err(StoreError::CodeConflict);
            }
            inner.code_index.insert(code.to_string(), pack.id.clone());
        }
        inner.packs.insert(pack.id.clone(), pack.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<GiftPack, StoreError> {
        self.inner
            .read()
            .unwrap()
            .packs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn get_by_code(&self, code: &str) -> Result<GiftPack, StoreError> {
        let inner = self.inner.read().unwrap();
        inner
            .code_index
            .get(code.trim())
            .and_then(|id| inner.packs.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("code:{}", code.trim())))
    }

    async fn get_by_chain_ref(&self, chain_ref: u64) -> Result<GiftPack, StoreError> {
        self.inner
            .read()
            .unwrap()
            .packs
            .values()
            .find(|p| p.chain_ref == Some(chain_ref))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("chain_ref:{chain_ref}")))
    }

    async fn update_draft(&self, id: &str, update: DraftUpdate) -> Result<GiftPack, StoreError> {
        let mut inner = self.inner.write().unwrap();

        // Code uniqueness is checked before any mutation
        if let Some(new_code) = update.gift_code.as_deref() {
            if let Some(owner) = inner.code_index.get(new_code.trim()) {
                if owner != id {
                    return Err(StoreError::CodeConflict);
                }
            }
        }

        let pack = inner
            .packs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if pack.status != PackStatus::Draft {
            return Err(StoreError::NotDraft {
                pack_id: id.to_string(),
                status: pack.status,
            });
        }

        if let Some(message) = update.message {
            pack.message = Some(message);
        }
        if let Some(expires_at) = update.expires_at {
            pack.expires_at = expires_at;
        }
        let old_code = pack.trimmed_code().map(str::to_string);
        if let Some(new_code) = update.gift_code {
            pack.gift_code = Some(new_code);
        }
        pack.updated_at = now_secs();
        let updated = pack.clone();

        if let Some(new_code) = updated.trimmed_code() {
            if old_code.as_deref() != Some(new_code) {
                if let Some(old) = old_code {
                    inner.code_index.remove(&old);
                }
                inner.code_index.insert(new_code.to_string(), id.to_string());
            }
        }

        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let pack = inner
            .packs
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if pack.status != PackStatus::Draft {
            return Err(StoreError::NotDraft {
                pack_id: id.to_string(),
                status: pack.status,
            });
        }
        let code = pack.trimmed_code().map(str::to_string);
        inner.packs.remove(id);
        if let Some(code) = code {
            inner.code_index.remove(&code);
        }
        Ok(())
    }

    async fn add_item(&self, id: &str, item: GiftItem) -> Result<GiftPack, StoreError> {
        item.validate()?;

        let mut inner = self.inner.write().unwrap();
        let pack = inner
            .packs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if pack.status != PackStatus::Draft {
            return Err(StoreError::NotDraft {
                pack_id: id.to_string(),
                status: pack.status,
            });
        }
        pack.items.push(item);
        pack.updated_at = now_secs();
        Ok(pack.clone())
    }

    async fn remove_item(&self, id: &str, index: usize) -> Result<GiftPack, StoreError> {
        let mut inner = self.inner.write().unwrap();
        let pack = inner
            .packs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if pack.status != PackStatus::Draft {
            return Err(StoreError::NotDraft {
                pack_id: id.to_string(),
                status: pack.status,
            });
        }
        if index >= pack.items.len() {
            return Err(StoreError::ItemNotFound {
                pack_id: id.to_string(),
                index,
            });
        }
        pack.items.remove(index);
        pack.updated_at = now_secs();
        Ok(pack.clone())
    }

    async fn set_status(&self, id: &str, status: PackStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let pack = inner
            .packs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !pack.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                pack_id: id.to_string(),
                from: pack.status,
                to: status,
            });
        }
        pack.status = status;
        pack.updated_at = now_secs();
        Ok(())
    }

    async fn set_chain_ref(&self, id: &str, chain_ref: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let pack = inner
            .packs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        pack.chain_ref = Some(chain_ref);
        pack.updated_at = now_secs();
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: PackStatus,
        limit: usize,
    ) -> Result<Vec<GiftPack>, StoreError> {
        let inner = self.inner.read().unwrap();
        let mut results: Vec<_> = inner
            .packs
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        results.sort_by_key(|p| p.created_at);
        results.truncate(limit);
        Ok(results)
    }

    async fn purge_stale_drafts(&self, cutoff: u64) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().unwrap();
        let stale: Vec<String> = inner
            .packs
            .values()
            .filter(|p| p.status == PackStatus::Draft && p.created_at < cutoff)
            .map(|p| p.id.clone())
            .collect();
        for id in &stale {
            if let Some(pack) = inner.packs.remove(id) {
                if let Some(code) = pack.trimmed_code() {
                    inner.code_index.remove(code);
                }
            }
        }
        Ok(stale.len())
    }

    async fn confirm_claim(
        &self,
        pack_id: &str,
        external_ref: &str,
    ) -> Result<ClaimTask, StoreError> {
        let mut inner = self.inner.write().unwrap();
        let pack = inner
            .packs
            .get_mut(pack_id)
            .ok_or_else(|| StoreError::NotFound(pack_id.to_string()))?;
        if !pack.status.can_transition_to(PackStatus::Claimed) {
            return Err(StoreError::InvalidTransition {
                pack_id: pack_id.to_string(),
                from: pack.status,
                to: PackStatus::Claimed,
            });
        }
        pack.status = PackStatus::Claimed;
        pack.updated_at = now_secs();

        // A relay-submitted claim already has a task for this external
        // ref; settle it instead of recording a second attempt
        if let Some(task) = inner
            .tasks
            .values_mut()
            .find(|t| t.pack_id == pack_id && t.external_ref == external_ref)
        {
            task.status = ClaimTaskStatus::Claimed;
            task.updated_at = now_secs();
            return Ok(task.clone());
        }

        let task = ClaimTask::new(pack_id, external_ref, ClaimTaskStatus::Claimed);
        inner.tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn insert_claim_task(&self, task: &ClaimTask) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if inner.tasks.contains_key(&task.id) {
            return Err(StoreError::DuplicateId(task.id.clone()));
        }
        inner.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn update_claim_task(
        &self,
        task_id: &str,
        status: ClaimTaskStatus,
    ) -> Result<ClaimTask, StoreError> {
        let mut inner = self.inner.write().unwrap();
        let task = inner
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::TaskNotFound(task_id.to_string()))?;
        task.status = status;
        task.updated_at = now_secs();
        Ok(task.clone())
    }

    async fn latest_claim_task(&self, pack_id: &str) -> Result<Option<ClaimTask>, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .tasks
            .values()
            .filter(|t| t.pack_id == pack_id)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn claim_task_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<ClaimTask>, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .tasks
            .values()
            .find(|t| t.external_ref == external_ref)
            .cloned())
    }
}
