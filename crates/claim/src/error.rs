use giftlock_ledger::LedgerError;
use giftlock_store::StoreError;
use giftlock_types::PackStatus;
use thiserror::Error;

use crate::RelayError;

#[derive(Debug, Error)]
pub enum ClaimError {
    /// Covers both packs that do not exist and packs that are not claimable.
    /// The two are deliberately indistinguishable so the claim endpoint
    /// cannot be used to probe which codes are real.
    #[error("gift pack not found")]
    NotFound,

    #[error("pack {pack_id} is {status}, cannot confirm a claim")]
    InvalidState { pack_id: String, status: PackStatus },

    #[error("claiming is unavailable: no relay or ledger connection configured")]
    ClaimingDisabled,

    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ClaimError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ClaimError::NotFound,
            StoreError::InvalidTransition { pack_id, from, .. } => {
                ClaimError::InvalidState {
                    pack_id,
                    status: from,
                }
            }
            other => ClaimError::Store(other),
        }
    }
}
