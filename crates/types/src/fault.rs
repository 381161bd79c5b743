use serde::{Deserialize, Serialize};

/// Classification of ledger-call failures.
///
/// Every failed contract interaction maps to one of these so callers see a
/// specific, actionable message instead of a single opaque failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerFault {
    /// Sender lacks funds for the transfer or gas
    InsufficientFunds,

    /// The wallet rejected the signing request
    UserRejected,

    /// RPC connectivity or timeout
    Network,

    /// The contract reverted the call
    Reverted,

    /// The contract's global pause flag is set
    Paused,

    /// The contract's active window has ended
    InactiveWindow,
}

impl LedgerFault {
    pub fn user_message(&self) -> &'static str {
        match self {
            LedgerFault::InsufficientFunds => {
                "insufficient funds to cover the transfer and network fees"
            }
            LedgerFault::UserRejected => "the transaction was rejected in the wallet",
            LedgerFault::Network => "the network is unreachable; please retry shortly",
            LedgerFault::Reverted => "the escrow contract rejected the call",
            LedgerFault::Paused => "the escrow contract is paused",
            LedgerFault::InactiveWindow => "the escrow contract's active period has ended",
        }
    }

    /// Transient faults are worth retrying without changing the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerFault::Network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_distinct() {
        let faults = [
            LedgerFault::InsufficientFunds,
            LedgerFault::UserRejected,
            LedgerFault::Network,
            LedgerFault::Reverted,
            LedgerFault::Paused,
            LedgerFault::InactiveWindow,
        ];
        let messages: std::collections::HashSet<_> =
            faults.iter().map(|f| f.user_message()).collect();
        assert_eq!(messages.len(), faults.len());
    }

    #[test]
    fn test_only_network_is_transient() {
        assert!(LedgerFault::Network.is_transient());
        assert!(!LedgerFault::Reverted.is_transient());
        assert!(!LedgerFault::Paused.is_transient());
    }
}
