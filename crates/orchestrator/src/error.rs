use giftlock_ledger::LedgerError;
use giftlock_store::StoreError;
use thiserror::Error;

use crate::ValidationReport;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("draft failed validation: {}", .0.summary())]
    Validation(ValidationReport),

    #[error("pack is already locked on-chain")]
    AlreadyLocked,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
