use giftlock_claim::{ClaimError, RelayError};
use giftlock_ledger::{LedgerError, ReconcileError};
use giftlock_orchestrator::{PlanError, ValidationReport};
use giftlock_store::StoreError;
use giftlock_types::LedgerFault;
use thiserror::Error;

/// Service-level error taxonomy.
///
/// Every variant maps cleanly onto an HTTP class at the API edge:
/// `Validation` and `BadRequest` are 400s, `NotFound` a 404, `Conflict` a
/// 409, `ServiceUnavailable` a 503, `Ledger` carries the user-facing fault
/// classification for wallet flows, `Internal` everything else.
#[derive(Debug, Error)]
pub enum GiftlockError {
    #[error("validation failed: {}", .0.summary())]
    Validation(ValidationReport),

    #[error("{0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("ledger error: {message}")]
    Ledger {
        fault: Option<LedgerFault>,
        message: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl GiftlockError {
    /// User-facing fault classification for wallet flows, when one applies.
    pub fn fault(&self) -> Option<LedgerFault> {
        match self {
            GiftlockError::Ledger { fault, .. } => *fault,
            _ => None,
        }
    }
}

impl From<StoreError> for GiftlockError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) | StoreError::TaskNotFound(_) => GiftlockError::NotFound,
            StoreError::CodeConflict | StoreError::DuplicateId(_) => {
                GiftlockError::Conflict(err.to_string())
            }
            StoreError::NotDraft { .. }
            | StoreError::InvalidTransition { .. }
            | StoreError::ItemNotFound { .. }
            | StoreError::InvalidItem(_) => GiftlockError::BadRequest(err.to_string()),
            StoreError::Database(_) | StoreError::Serialization(_) | StoreError::Connection(_) => {
                GiftlockError::Internal(err.to_string())
            }
        }
    }
}

impl From<LedgerError> for GiftlockError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Disabled => GiftlockError::ServiceUnavailable(err.to_string()),
            LedgerError::PackNotFound(_) => GiftlockError::NotFound,
            other => GiftlockError::Ledger {
                fault: other.fault_class(),
                message: other.to_string(),
            },
        }
    }
}

impl From<PlanError> for GiftlockError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::Validation(report) => GiftlockError::Validation(report),
            PlanError::AlreadyLocked => GiftlockError::Conflict(err.to_string()),
            PlanError::Store(e) => e.into(),
            PlanError::Ledger(e) => e.into(),
        }
    }
}

impl From<ClaimError> for GiftlockError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::NotFound => GiftlockError::NotFound,
            ClaimError::InvalidState { .. } => GiftlockError::BadRequest(err.to_string()),
            ClaimError::ClaimingDisabled => GiftlockError::ServiceUnavailable(err.to_string()),
            ClaimError::Relay(RelayError::Rejected(m)) => GiftlockError::BadRequest(m),
            ClaimError::Relay(e) => GiftlockError::ServiceUnavailable(e.to_string()),
            ClaimError::Ledger(e) => e.into(),
            ClaimError::Store(e) => e.into(),
        }
    }
}

impl From<ReconcileError> for GiftlockError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Ledger(e) => e.into(),
            ReconcileError::Store(e) => e.into(),
            ReconcileError::MissingCode(_)
            | ReconcileError::NotPending { .. }
            | ReconcileError::NotLockedYet(_) => GiftlockError::BadRequest(err.to_string()),
        }
    }
}
