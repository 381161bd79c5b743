use async_trait::async_trait;
use giftlock_types::CodeHash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{LedgerError, PlannedCall};

/// Read queries against the escrow contract. Variants correspond to the
/// contract's current and legacy read entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerQuery {
    /// Current read shape: structured pack state by on-chain id
    PackState { pack_id: u64 },

    /// Previous shape: nested token object, different field names
    PackInfo { pack_id: u64 },

    /// Oldest shape: flat positional tuple
    LegacyPack { pack_id: u64 },

    /// Lock-plan progress for a pack keyed by code hash
    LockProgress { code_hash: String },
}

/// How far a lock plan has progressed on-chain, keyed by code hash.
/// Drives idempotent plan resumption after partial failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockProgress {
    /// The create-pack step was confirmed
    pub created: bool,

    /// Number of attach-asset steps confirmed
    pub attached_count: usize,

    /// The terminal lock step was confirmed
    pub locked: bool,

    /// On-chain pack id, known once created
    pub chain_ref: Option<u64>,
}

/// External interface of the on-chain escrow contract.
///
/// Every method respects the contract's global pause flag and active-until
/// window; when gated, calls fail with `Paused` or `ActiveWindowClosed`
/// rather than a generic error.
#[async_trait]
pub trait EscrowLedger: Send + Sync {
    /// Issue a read and return the raw response for shape-specific
    /// decoding. Absence is `Err(PackNotFound)`.
    async fn query_pack(&self, query: LedgerQuery) -> Result<serde_json::Value, LedgerError>;

    /// Progress of the lock plan identified by `code_hash`.
    async fn lock_progress(&self, code_hash: &CodeHash) -> Result<LockProgress, LedgerError>;

    /// Execute a planned call as `sender`, returning the transaction hash.
    /// In production this path belongs to the sender's wallet or the relay;
    /// the orchestration service itself never signs.
    async fn execute(&self, call: &PlannedCall, sender: &str) -> Result<String, LedgerError>;

    async fn is_connected(&self) -> bool;
}

/// Explicit connection state, passed into each component at construction.
///
/// `Disabled` replaces the nullable-client-plus-boolean pattern: a
/// component holding this value can always ask for the ledger and gets a
/// typed `Disabled` error instead of a crash when none is configured.
#[derive(Clone)]
pub enum LedgerConnection {
    Configured(Arc<dyn EscrowLedger>),
    Disabled,
}

impl LedgerConnection {
    pub fn configured(ledger: Arc<dyn EscrowLedger>) -> Self {
        LedgerConnection::Configured(ledger)
    }

    pub fn disabled() -> Self {
        LedgerConnection::Disabled
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, LedgerConnection::Configured(_))
    }

    pub fn ledger(&self) -> Result<&Arc<dyn EscrowLedger>, LedgerError> {
        match self {
            LedgerConnection::Configured(ledger) => Ok(ledger),
            LedgerConnection::Disabled => Err(LedgerError::Disabled),
        }
    }
}

impl std::fmt::Debug for LedgerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerConnection::Configured(_) => f.write_str("LedgerConnection::Configured"),
            LedgerConnection::Disabled => f.write_str("LedgerConnection::Disabled"),
        }
    }
}
