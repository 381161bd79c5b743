use giftlock_store::{GiftPackStore, StoreError};
use giftlock_types::{CodeHash, GiftPack, PackStatus};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{LedgerConnection, LedgerError, LedgerQuery};

/// Canonical pack state decoded from a ledger read, whatever shape the
/// contract answered in.
#[derive(Debug, Clone, PartialEq)]
pub struct OnChainPack {
    pub token_address: String,
    pub token_id: Option<u64>,
    pub amount: u128,
    pub sender: String,
    pub expires_at: u64,
    pub claimed: bool,
}

/// Status derived from an on-chain read.
///
/// Advisory only: used for presentation and pre-claim checks, never as
/// claim authorization. The contract's own claim entry point is the final
/// arbiter of at-most-once claiming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    Locked,
    Claimed,
    Expired,
}

/// A typed read strategy: one query shape plus its decode step.
///
/// Strategies are tried in a fixed order; a shape whose call or decode
/// fails is skipped, replacing the runtime capability probing the
/// contract's legacy ABI variance used to require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadShape {
    /// Current structured shape
    StateV2,

    /// Previous shape with a nested token object
    InfoV1,

    /// Oldest shape: flat positional tuple
    LegacyTuple,
}

impl ReadShape {
    /// Fallback order, primary first.
    pub const ORDERED: [ReadShape; 3] = [ReadShape::StateV2, ReadShape::InfoV1, ReadShape::LegacyTuple];

    pub fn name(&self) -> &'static str {
        match self {
            ReadShape::StateV2 => "pack_state",
            ReadShape::InfoV1 => "pack_info",
            ReadShape::LegacyTuple => "legacy_pack",
        }
    }

    fn query(&self, pack_id: u64) -> LedgerQuery {
        match self {
            ReadShape::StateV2 => LedgerQuery::PackState { pack_id },
            ReadShape::InfoV1 => LedgerQuery::PackInfo { pack_id },
            ReadShape::LegacyTuple => LedgerQuery::LegacyPack { pack_id },
        }
    }

    fn decode(&self, value: Value) -> Result<OnChainPack, LedgerError> {
        match self {
            ReadShape::StateV2 => {
                #[derive(Deserialize)]
                struct StateV2 {
                    token_address: String,
                    token_id: Option<u64>,
                    amount: String,
                    sender: String,
                    expires_at: u64,
                    claimed: bool,
                }
                let raw: StateV2 = serde_json::from_value(value)
                    .map_err(|e| LedgerError::Decode(e.to_string()))?;
                Ok(OnChainPack {
                    token_address: raw.token_address,
                    token_id: raw.token_id,
                    amount: parse_amount(&raw.amount)?,
                    sender: raw.sender,
                    expires_at: raw.expires_at,
                    claimed: raw.claimed,
                })
            }
            ReadShape::InfoV1 => {
                #[derive(Deserialize)]
                struct Token {
                    address: String,
                    id: Option<u64>,
                    amount: String,
                }
                #[derive(Deserialize)]
                struct InfoV1 {
                    token: Token,
                    owner: String,
                    expiry: u64,
                    is_claimed: bool,
                }
                let raw: InfoV1 = serde_json::from_value(value)
                    .map_err(|e| LedgerError::Decode(e.to_string()))?;
                Ok(OnChainPack {
                    token_address: raw.token.address,
                    token_id: raw.token.id,
                    amount: parse_amount(&raw.token.amount)?,
                    sender: raw.owner,
                    expires_at: raw.expiry,
                    claimed: raw.is_claimed,
                })
            }
            ReadShape::LegacyTuple => {
                let raw: (String, Option<u64>, String, String, u64, bool) =
                    serde_json::from_value(value)
                        .map_err(|e| LedgerError::Decode(e.to_string()))?;
                Ok(OnChainPack {
                    token_address: raw.0,
                    token_id: raw.1,
                    amount: parse_amount(&raw.2)?,
                    sender: raw.3,
                    expires_at: raw.4,
                    claimed: raw.5,
                })
            }
        }
    }
}

fn parse_amount(raw: &str) -> Result<u128, LedgerError> {
    raw.parse()
        .map_err(|_| LedgerError::Decode(format!("bad amount: {raw}")))
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("pack {0} has no gift code to reconcile by")]
    MissingCode(String),

    #[error("pack {pack_id} is {status}, expected lock_pending")]
    NotPending { pack_id: String, status: PackStatus },

    #[error("pack {0} is not locked on-chain yet")]
    NotLockedYet(String),
}

/// Translates ledger reads into the canonical pack status used by the rest
/// of the system.
pub struct StatusReconciler {
    connection: LedgerConnection,
}

impl StatusReconciler {
    pub fn new(connection: LedgerConnection) -> Self {
        Self { connection }
    }

    /// Read the on-chain pack state, falling through the read shapes in
    /// order. Shape-specific call or decode failures are absorbed and the
    /// next shape tried; infrastructure failures (pause gate, network)
    /// propagate immediately, and an explicit absence report is final.
    pub async fn fetch(&self, chain_ref: u64) -> Result<OnChainPack, ReconcileError> {
        let ledger = self.connection.ledger()?;

        for shape in ReadShape::ORDERED {
            match ledger.query_pack(shape.query(chain_ref)).await {
                Ok(value) => match shape.decode(value) {
                    Ok(pack) => return Ok(pack),
                    Err(e) => {
                        debug!(shape = shape.name(), chain_ref, error = %e, "read shape decode failed, falling back");
                    }
                },
                Err(LedgerError::PackNotFound(_)) => {
                    return Err(LedgerError::PackNotFound(chain_ref.to_string()).into());
                }
                Err(e) if e.is_gated() || matches!(e, LedgerError::Network(_) | LedgerError::Timeout(_)) => {
                    return Err(e.into());
                }
                Err(e) => {
                    debug!(shape = shape.name(), chain_ref, error = %e, "read shape call failed, falling back");
                }
            }
        }

        Err(LedgerError::PackNotFound(chain_ref.to_string()).into())
    }

    /// Derive the presentation status from an on-chain read.
    pub fn derive_status(pack: &OnChainPack, current_time: u64) -> ChainStatus {
        if pack.claimed {
            ChainStatus::Claimed
        } else if pack.expires_at < current_time {
            ChainStatus::Expired
        } else {
            ChainStatus::Locked
        }
    }

    /// Fetch plus derivation, for presentation endpoints.
    pub async fn chain_status(
        &self,
        chain_ref: u64,
        current_time: u64,
    ) -> Result<ChainStatus, ReconcileError> {
        let pack = self.fetch(chain_ref).await?;
        Ok(Self::derive_status(&pack, current_time))
    }

    /// Promote a `LockPending` pack to `Locked` once the ledger confirms
    /// the terminal lock step, recording the on-chain id along the way.
    pub async fn confirm_lock(
        &self,
        store: &dyn GiftPackStore,
        pack_id: &str,
    ) -> Result<GiftPack, ReconcileError> {
        let pack = store.get(pack_id).await?;
        if pack.status != PackStatus::LockPending {
            return Err(ReconcileError::NotPending {
                pack_id: pack_id.to_string(),
                status: pack.status,
            });
        }
        let code = pack
            .trimmed_code()
            .ok_or_else(|| ReconcileError::MissingCode(pack_id.to_string()))?;

        let ledger = self.connection.ledger()?;
        let progress = ledger.lock_progress(&CodeHash::of(code)).await?;
        if !progress.locked {
            return Err(ReconcileError::NotLockedYet(pack_id.to_string()));
        }

        if let Some(chain_ref) = progress.chain_ref {
            store.set_chain_ref(pack_id, chain_ref).await?;
        }
        store.set_status(pack_id, PackStatus::Locked).await?;
        info!(pack_id, chain_ref = ?progress.chain_ref, "lock confirmed on-chain");
        store.get(pack_id).await.map_err(Into::into)
    }
}
