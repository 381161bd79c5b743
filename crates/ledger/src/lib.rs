pub mod connection;
pub mod error;
pub mod mock;
pub mod msg;
pub mod reconciler;

pub use connection::{EscrowLedger, LedgerConnection, LedgerQuery, LockProgress};
pub use error::LedgerError;
pub use mock::MockLedger;
pub use msg::{LedgerMsg, PlannedCall};
pub use reconciler::{ChainStatus, OnChainPack, ReadShape, ReconcileError, StatusReconciler};
