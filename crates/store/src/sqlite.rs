use async_trait::async_trait;
use giftlock_types::{
    now_secs, ClaimTask, ClaimTaskStatus, GiftItem, GiftPack, PackStatus,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::{DraftUpdate, GiftPackStore, StoreError};

/// Durable store backed by SQLite via sqlx.
///
/// `confirm_claim` runs the task insert and the pack's status flip inside
/// one SQL transaction, with the `WHERE status = 'locked'` guard acting as
/// the compare-and-swap.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// In-memory SQLite database (for testing). A single connection keeps
    /// every caller on the same database instance.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        for migration in [
            include_str!("../migrations/001_create_packs.sql"),
            include_str!("../migrations/002_create_claim_tasks.sql"),
        ] {
            // Each file may hold several statements
            for statement in migration.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StoreError::Database(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn row_to_pack(row: &sqlx::sqlite::SqliteRow) -> Result<GiftPack, StoreError> {
        let status = parse_pack_status(row.get("status"))?;
        let items: Vec<GiftItem> = serde_json::from_str(row.get::<String, _>("items").as_str())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(GiftPack {
            id: row.get("id"),
            sender: row.get("sender"),
            message: row.get("message"),
            expires_at: row.get::<i64, _>("expires_at") as u64,
            status,
            gift_code: row.get("gift_code"),
            chain_ref: row.get::<Option<i64>, _>("chain_ref").map(|v| v as u64),
            items,
            created_at: row.get::<i64, _>("created_at") as u64,
            updated_at: row.get::<i64, _>("updated_at") as u64,
        })
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<ClaimTask, StoreError> {
        Ok(ClaimTask {
            id: row.get("id"),
            pack_id: row.get("pack_id"),
            external_ref: row.get("external_ref"),
            status: parse_task_status(row.get("status"))?,
            created_at: row.get::<i64, _>("created_at") as u64,
            updated_at: row.get::<i64, _>("updated_at") as u64,
        })
    }

    async fn fetch_draft(&self, id: &str) -> Result<GiftPack, StoreError> {
        let pack = self.get(id).await?;
        if pack.status != PackStatus::Draft {
            return Err(StoreError::NotDraft {
                pack_id: id.to_string(),
                status: pack.status,
            });
        }
        Ok(pack)
    }

    async fn write_items(&self, pack: &GiftPack) -> Result<(), StoreError> {
        let items = serde_json::to_string(&pack.items)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        // Re-check Draft in SQL: the pack may have left Draft since the
        // caller's snapshot was taken
        let done = sqlx::query(
            "UPDATE packs SET items = ?, updated_at = ? WHERE id = ? AND status = 'draft'",
        )
        .bind(items)
        .bind(now_secs() as i64)
        .bind(&pack.id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if done.rows_affected() == 0 {
            let current = self.get(&pack.id).await?;
            return Err(StoreError::NotDraft {
                pack_id: pack.id.clone(),
                status: current.status,
            });
        }
        Ok(())
    }
}

fn pack_status_str(status: PackStatus) -> &'static str {
    match status {
        PackStatus::Draft => "draft",
        PackStatus::LockPending => "lock_pending",
        PackStatus::Locked => "locked",
        PackStatus::Claimed => "claimed",
        PackStatus::Refunded => "refunded",
    }
}

fn parse_pack_status(s: String) -> Result<PackStatus, StoreError> {
    match s.as_str() {
        "draft" => Ok(PackStatus::Draft),
        "lock_pending" => Ok(PackStatus::LockPending),
        "locked" => Ok(PackStatus::Locked),
        "claimed" => Ok(PackStatus::Claimed),
        "refunded" => Ok(PackStatus::Refunded),
        other => Err(StoreError::Serialization(format!(
            "unknown pack status: {other}"
        ))),
    }
}

fn task_status_str(status: ClaimTaskStatus) -> &'static str {
    match status {
        ClaimTaskStatus::Pending => "pending",
        ClaimTaskStatus::Processing => "processing",
        ClaimTaskStatus::Claimed => "claimed",
        ClaimTaskStatus::Failed => "failed",
    }
}

fn parse_task_status(s: String) -> Result<ClaimTaskStatus, StoreError> {
    match s.as_str() {
        "pending" => Ok(ClaimTaskStatus::Pending),
        "processing" => Ok(ClaimTaskStatus::Processing),
        "claimed" => Ok(ClaimTaskStatus::Claimed),
        "failed" => Ok(ClaimTaskStatus::Failed),
        other => Err(StoreError::Serialization(format!(
            "unknown task status: {other}"
        ))),
    }
}

#[async_trait]
impl GiftPackStore for SqliteStore {
    async fn create(&self, pack: &GiftPack) -> Result<(), StoreError> {
        let items = serde_json::to_string(&pack.items)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let gift_code = pack.trimmed_code();

        let result = sqlx::query(
            r#"
            INSERT INTO packs (
                id, sender, message, expires_at, status, gift_code,
                chain_ref, items, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pack.id)
        .bind(&pack.sender)
        .bind(&pack.message)
        .bind(pack.expires_at as i64)
        .bind(pack_status_str(pack.status))
        .bind(gift_code)
        .bind(pack.chain_ref.map(|v| v as i64))
        .bind(items)
        .bind(pack.created_at as i64)
        .bind(pack.updated_at as i64)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                if db_err.message().contains("gift_code") {
                    Err(StoreError::CodeConflict)
                } else {
                    Err(StoreError::DuplicateId(pack.id.clone()))
                }
            }
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    async fn get(&self, id: &str) -> Result<GiftPack, StoreError> {
        let row = sqlx::query("SELECT * FROM packs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match row {
            Some(row) => Self::row_to_pack(&row),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn get_by_code(&self, code: &str) -> Result<GiftPack, StoreError> {
        let row = sqlx::query("SELECT * FROM packs WHERE gift_code = ? LIMIT 1")
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match row {
            Some(row) => Self::row_to_pack(&row),
            None => Err(StoreError::NotFound(format!("code:{}", code.trim()))),
        }
    }

    async fn get_by_chain_ref(&self, chain_ref: u64) -> Result<GiftPack, StoreError> {
        let row = sqlx::query("SELECT * FROM packs WHERE chain_ref = ? LIMIT 1")
            .bind(chain_ref as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match row {
            Some(row) => Self::row_to_pack(&row),
            None => Err(StoreError::NotFound(format!("chain_ref:{chain_ref}"))),
        }
    }

    async fn update_draft(&self, id: &str, update: DraftUpdate) -> Result<GiftPack, StoreError> {
        let mut pack = self.fetch_draft(id).await?;

        if let Some(message) = update.message {
            pack.message = Some(message);
        }
        if let Some(expires_at) = update.expires_at {
            pack.expires_at = expires_at;
        }
        if let Some(gift_code) = update.gift_code {
            pack.gift_code = Some(gift_code);
        }
        // Store and return the normalized form so the record matches the row
        let normalized = pack.trimmed_code().map(str::to_string);
        pack.gift_code = normalized;
        pack.updated_at = now_secs();

        let result = sqlx::query(
            r#"
            UPDATE packs
            SET message = ?, expires_at = ?, gift_code = ?, updated_at = ?
            WHERE id = ? AND status = 'draft'
            "#,
        )
        .bind(&pack.message)
        .bind(pack.expires_at as i64)
        .bind(&pack.gift_code)
        .bind(pack.updated_at as i64)
        .bind(id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::NotFound(id.to_string())),
            Ok(_) => Ok(pack),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::CodeConflict)
            }
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.fetch_draft(id).await?;
        sqlx::query("DELETE FROM packs WHERE id = ? AND status = 'draft'")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn add_item(&self, id: &str, item: GiftItem) -> Result<GiftPack, StoreError> {
        item.validate()?;
        let mut pack = self.fetch_draft(id).await?;
        pack.items.push(item);
        self.write_items(&pack).await?;
        self.get(id).await
    }

    async fn remove_item(&self, id: &str, index: usize) -> Result<GiftPack, StoreError> {
        let mut pack = self.fetch_draft(id).await?;
        if index >= pack.items.len() {
            return Err(StoreError::ItemNotFound {
                pack_id: id.to_string(),
                index,
            });
        }
        pack.items.remove(index);
        self.write_items(&pack).await?;
        self.get(id).await
    }

    async fn set_status(&self, id: &str, status: PackStatus) -> Result<(), StoreError> {
        let pack = self.get(id).await?;
        if !pack.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                pack_id: id.to_string(),
                from: pack.status,
                to: status,
            });
        }

        // Guard on the old status so a concurrent transition loses cleanly
        let done = sqlx::query("UPDATE packs SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(pack_status_str(status))
            .bind(now_secs() as i64)
            .bind(id)
            .bind(pack_status_str(pack.status))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if done.rows_affected() == 0 {
            return Err(StoreError::InvalidTransition {
                pack_id: id.to_string(),
                from: pack.status,
                to: status,
            });
        }
        Ok(())
    }

    async fn set_chain_ref(&self, id: &str, chain_ref: u64) -> Result<(), StoreError> {
        let done = sqlx::query("UPDATE packs SET chain_ref = ?, updated_at = ? WHERE id = ?")
            .bind(chain_ref as i64)
            .bind(now_secs() as i64)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: PackStatus,
        limit: usize,
    ) -> Result<Vec<GiftPack>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM packs WHERE status = ? ORDER BY created_at ASC LIMIT ?")
                .bind(pack_status_str(status))
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_pack).collect()
    }

    async fn purge_stale_drafts(&self, cutoff: u64) -> Result<usize, StoreError> {
        let done = sqlx::query("DELETE FROM packs WHERE status = 'draft' AND created_at < ?")
            .bind(cutoff as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(done.rows_affected() as usize)
    }

    async fn confirm_claim(
        &self,
        pack_id: &str,
        external_ref: &str,
    ) -> Result<ClaimTask, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let done = sqlx::query(
            "UPDATE packs SET status = 'claimed', updated_at = ? WHERE id = ? AND status = 'locked'",
        )
        .bind(now_secs() as i64)
        .bind(pack_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if done.rows_affected() == 0 {
            // Not locked: either unknown, never locked, or already claimed.
            // Read through the transaction; the pool may have no free
            // connection while this one is held.
            let row = sqlx::query("SELECT status FROM packs WHERE id = ?")
                .bind(pack_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
            let from = match row {
                Some(row) => parse_pack_status(row.get("status"))?,
                None => return Err(StoreError::NotFound(pack_id.to_string())),
            };
            return Err(StoreError::InvalidTransition {
                pack_id: pack_id.to_string(),
                from,
                to: PackStatus::Claimed,
            });
        }

        // A relay-submitted claim already has a task for this external
        // ref; settle it instead of recording a second attempt
        let settled = sqlx::query(
            "UPDATE claim_tasks SET status = 'claimed', updated_at = ? WHERE pack_id = ? AND external_ref = ?",
        )
        .bind(now_secs() as i64)
        .bind(pack_id)
        .bind(external_ref)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let task = if settled.rows_affected() > 0 {
            let row = sqlx::query(
                "SELECT * FROM claim_tasks WHERE pack_id = ? AND external_ref = ? LIMIT 1",
            )
            .bind(pack_id)
            .bind(external_ref)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
            Self::row_to_task(&row)?
        } else {
            let task = ClaimTask::new(pack_id, external_ref, ClaimTaskStatus::Claimed);
            sqlx::query(
                r#"
                INSERT INTO claim_tasks (id, pack_id, external_ref, status, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&task.id)
            .bind(&task.pack_id)
            .bind(&task.external_ref)
            .bind(task_status_str(task.status))
            .bind(task.created_at as i64)
            .bind(task.updated_at as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
            task
        };

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(task)
    }

    async fn insert_claim_task(&self, task: &ClaimTask) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO claim_tasks (id, pack_id, external_ref, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.pack_id)
        .bind(&task.external_ref)
        .bind(task_status_str(task.status))
        .bind(task.created_at as i64)
        .bind(task.updated_at as i64)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateId(task.id.clone()))
            }
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    async fn update_claim_task(
        &self,
        task_id: &str,
        status: ClaimTaskStatus,
    ) -> Result<ClaimTask, StoreError> {
        let done = sqlx::query("UPDATE claim_tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(task_status_str(status))
            .bind(now_secs() as i64)
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if done.rows_affected() == 0 {
            return Err(StoreError::TaskNotFound(task_id.to_string()));
        }

        let row = sqlx::query("SELECT * FROM claim_tasks WHERE id = ?")
            .bind(task_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Self::row_to_task(&row)
    }

    async fn latest_claim_task(&self, pack_id: &str) -> Result<Option<ClaimTask>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM claim_tasks WHERE pack_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(pack_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_task).transpose()
    }

    async fn claim_task_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<ClaimTask>, StoreError> {
        let row = sqlx::query("SELECT * FROM claim_tasks WHERE external_ref = ? LIMIT 1")
            .bind(external_ref)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_task).transpose()
    }
}
