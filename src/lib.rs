//! Gift pack escrow orchestration.
//!
//! Senders compose gift packs off-chain, lock the assets into an escrow
//! contract through an ordered call plan executed by their own wallet, and
//! recipients claim with a secret code, either gaslessly through a relay or
//! by signing the claim call themselves. The off-chain store is a cache;
//! the contract is the source of truth for custody and at-most-once
//! claiming, and the reconciler keeps the two in step.

use std::sync::Arc;

use tracing::info;

pub use giftlock_claim::{
    ClaimCoordinator, ClaimError, ClaimOutcome, HttpRelay, MockRelay, PackLookup, RelayClient,
    RelayError,
};
pub use giftlock_config::{validate_config, AppConfig, ConfigError, ConfigLoader};
pub use giftlock_ledger::{
    ChainStatus, EscrowLedger, LedgerConnection, LedgerError, LedgerMsg, LockProgress, MockLedger,
    OnChainPack, PlannedCall, ReconcileError, StatusReconciler,
};
pub use giftlock_orchestrator::{
    DraftValidator, LockOrchestrator, LockPlan, PlanError, ValidationIssue, ValidationReport,
};
pub use giftlock_store::{
    DraftSweeper, DraftUpdate, GiftPackStore, InMemoryStore, SqliteStore, StoreError, SweeperConfig,
};
pub use giftlock_types::{
    now_secs, AssetKind, ClaimTask, ClaimTaskStatus, CodeHash, GiftItem, GiftPack, ItemError,
    LedgerFault, PackStatus,
};

mod error;
mod service;

pub use error::GiftlockError;
pub use service::GiftPackService;

/// Initialize structured logging. `RUST_LOG` wins when set; `level`
/// otherwise.
pub fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Build the relay client named by the configuration: none when disabled,
/// the in-process mock when `relay.mock` is set, the REST client otherwise.
pub fn build_relay(config: &AppConfig) -> Result<Option<Arc<dyn RelayClient>>, GiftlockError> {
    if !config.relay.enabled {
        return Ok(None);
    }
    if config.relay.mock {
        info!("using mock relay");
        return Ok(Some(Arc::new(MockRelay::new())));
    }
    let relay = HttpRelay::new(
        &config.relay.endpoint,
        &config.relay.api_key,
        std::time::Duration::from_millis(config.relay.timeout_ms),
    )
    .map_err(|e| GiftlockError::ServiceUnavailable(e.to_string()))?;
    info!(endpoint = %config.relay.endpoint, "using relay service");
    Ok(Some(Arc::new(relay)))
}

/// Build the store named by the configuration: SQLite when a path is set,
/// in-memory otherwise.
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn GiftPackStore>, GiftlockError> {
    if config.store.db_path.trim().is_empty() {
        info!("using in-memory pack store");
        Ok(Arc::new(InMemoryStore::new()))
    } else {
        let store = SqliteStore::new(&config.store.db_path)
            .await
            .map_err(GiftlockError::from)?;
        info!(path = %config.store.db_path, "opened sqlite pack store");
        Ok(Arc::new(store))
    }
}
