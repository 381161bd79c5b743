use giftlock_types::LedgerFault;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no ledger connection configured")]
    Disabled,

    #[error("escrow contract is paused")]
    Paused,

    #[error("escrow contract active window closed at {until}")]
    ActiveWindowClosed { until: u64 },

    #[error("pack not found on chain: {0}")]
    PackNotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("ledger call timed out: {0}")]
    Timeout(String),

    #[error("call reverted: {0}")]
    Reverted(String),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("rejected by user wallet")]
    UserRejected,

    #[error("failed to decode ledger response: {0}")]
    Decode(String),
}

impl LedgerError {
    /// User-facing fault classification, when one applies.
    pub fn fault_class(&self) -> Option<LedgerFault> {
        match self {
            LedgerError::Paused => Some(LedgerFault::Paused),
            LedgerError::ActiveWindowClosed { .. } => Some(LedgerFault::InactiveWindow),
            LedgerError::Network(_) | LedgerError::Timeout(_) => Some(LedgerFault::Network),
            LedgerError::Reverted(_) => Some(LedgerFault::Reverted),
            LedgerError::InsufficientFunds => Some(LedgerFault::InsufficientFunds),
            LedgerError::UserRejected => Some(LedgerFault::UserRejected),
            LedgerError::Disabled | LedgerError::PackNotFound(_) | LedgerError::Decode(_) => None,
        }
    }

    /// Whether the contract's global gate (pause flag or active window)
    /// caused the failure.
    pub fn is_gated(&self) -> bool {
        matches!(
            self,
            LedgerError::Paused | LedgerError::ActiveWindowClosed { .. }
        )
    }
}
