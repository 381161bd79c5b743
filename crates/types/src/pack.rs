use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{now_secs, GiftItem};

/// Off-chain lifecycle status of a gift pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackStatus {
    /// Being composed by the sender; items and metadata are mutable
    Draft,

    /// A lock plan has been generated and handed to the sender's wallet,
    /// but the terminal lock step has not been observed on-chain yet
    LockPending,

    /// The escrow contract holds the assets; the pack is claimable
    Locked,

    /// A claim was confirmed
    Claimed,

    /// Returned to the sender by the expiry/refund process
    Refunded,
}

impl PackStatus {
    /// Whether moving to `next` is a legal transition.
    ///
    /// Transitions are monotonic: once a pack leaves `Draft` it never
    /// returns, and `Claimed`/`Refunded` are terminal.
    pub fn can_transition_to(&self, next: PackStatus) -> bool {
        use PackStatus::*;
        matches!(
            (self, next),
            (Draft, LockPending) | (LockPending, Locked) | (Locked, Claimed) | (Locked, Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PackStatus::Claimed | PackStatus::Refunded)
    }
}

impl std::fmt::Display for PackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PackStatus::Draft => "draft",
            PackStatus::LockPending => "lock_pending",
            PackStatus::Locked => "locked",
            PackStatus::Claimed => "claimed",
            PackStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

/// A bundle of assets awaiting or having completed on-chain custody
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftPack {
    /// Unique identifier (uuid v4)
    pub id: String,

    /// Sender's address
    pub sender: String,

    /// Optional message shown to the claimer
    pub message: Option<String>,

    /// Unix timestamp after which the pack is refundable
    pub expires_at: u64,

    pub status: PackStatus,

    /// Secret claim code; globally unique across packs when present
    pub gift_code: Option<String>,

    /// On-chain pack id, known once the create step is confirmed
    pub chain_ref: Option<u64>,

    /// Asset composition; mutable only while `Draft`
    pub items: Vec<GiftItem>,

    pub created_at: u64,
    pub updated_at: u64,
}

impl GiftPack {
    pub fn new(
        sender: impl Into<String>,
        message: Option<String>,
        expires_at: u64,
        gift_code: Option<String>,
    ) -> Self {
        let now = now_secs();
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            message,
            expires_at,
            status: PackStatus::Draft,
            gift_code,
            chain_ref: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, current_time: u64) -> bool {
        current_time >= self.expires_at
    }

    /// Items may only change while the pack is a draft
    pub fn is_mutable(&self) -> bool {
        self.status == PackStatus::Draft
    }

    /// The trimmed gift code, if one is set and non-empty
    pub fn trimmed_code(&self) -> Option<&str> {
        self.gift_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
