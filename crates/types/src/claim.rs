use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::now_secs;

/// Status of a claim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimTaskStatus {
    /// Recorded, nothing submitted yet
    Pending,

    /// Submitted to the relay, awaiting its callback
    Processing,

    /// The claim was confirmed
    Claimed,

    /// The relay reported failure; the pack remains claimable
    Failed,
}

/// Record of one claim attempt against a gift pack.
///
/// Tasks are append-only: outcomes update `status`, but a task is never
/// deleted, so the attempt history survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimTask {
    pub id: String,

    /// The gift pack this attempt targets
    pub pack_id: String,

    /// Relay task id or transaction hash, depending on the claim path
    pub external_ref: String,

    pub status: ClaimTaskStatus,

    pub created_at: u64,
    pub updated_at: u64,
}

impl ClaimTask {
    pub fn new(
        pack_id: impl Into<String>,
        external_ref: impl Into<String>,
        status: ClaimTaskStatus,
    ) -> Self {
        let now = now_secs();
        Self {
            id: Uuid::new_v4().to_string(),
            pack_id: pack_id.into(),
            external_ref: external_ref.into(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(
            self.status,
            ClaimTaskStatus::Claimed | ClaimTaskStatus::Failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task() {
        let task = ClaimTask::new("pack-1", "task-abc", ClaimTaskStatus::Processing);
        assert_eq!(task.pack_id, "pack-1");
        assert_eq!(task.external_ref, "task-abc");
        assert!(!task.is_settled());
    }

    #[test]
    fn test_settled_states() {
        let mut task = ClaimTask::new("pack-1", "0xabc", ClaimTaskStatus::Claimed);
        assert!(task.is_settled());
        task.status = ClaimTaskStatus::Failed;
        assert!(task.is_settled());
        task.status = ClaimTaskStatus::Pending;
        assert!(!task.is_settled());
    }
}
