use std::sync::Arc;
use std::time::Duration;

use giftlock_types::now_secs;
use tracing::{debug, warn};

use crate::GiftPackStore;

/// Settings for the draft purge sweep
#[derive(Clone, Debug)]
pub struct SweeperConfig {
    /// How often the sweep runs
    pub interval: Duration,

    /// Drafts older than this are removed
    pub retention: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            retention: Duration::from_secs(24 * 3600),
        }
    }
}

/// Background hygiene job removing abandoned drafts.
///
/// Best-effort only: it touches nothing but `Draft` rows past the
/// retention cutoff, so it is safe to run concurrently with normal
/// traffic, and a failed sweep is logged and retried on the next tick.
pub struct DraftSweeper {
    store: Arc<dyn GiftPackStore>,
    config: SweeperConfig,
}

impl DraftSweeper {
    pub fn new(store: Arc<dyn GiftPackStore>, config: SweeperConfig) -> Self {
        Self { store, config }
    }

    /// Run one sweep immediately; returns the number of purged drafts.
    pub async fn sweep_once(&self) -> usize {
        let cutoff = now_secs().saturating_sub(self.config.retention.as_secs());
        match self.store.purge_stale_drafts(cutoff).await {
            Ok(purged) => {
                if purged > 0 {
                    debug!(purged, cutoff, "purged stale drafts");
                }
                purged
            }
            Err(e) => {
                warn!(error = %e, "draft purge sweep failed");
                0
            }
        }
    }

    /// Spawn the periodic sweep on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            // The first tick fires immediately; skip it so a fresh boot
            // does not race store initialization.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use giftlock_types::GiftPack;

    #[tokio::test]
    async fn test_sweep_once_purges_old_drafts() {
        let store = Arc::new(InMemoryStore::new());

        let mut old = GiftPack::new("0xsender", None, now_secs() + 3600, Some("OLD".to_string()));
        old.created_at = now_secs() - 48 * 3600;
        store.create(&old).await.unwrap();

        let fresh = GiftPack::new("0xsender", None, now_secs() + 3600, Some("NEW".to_string()));
        store.create(&fresh).await.unwrap();

        let sweeper = DraftSweeper::new(store.clone(), SweeperConfig::default());
        assert_eq!(sweeper.sweep_once().await, 1);
        assert!(store.get(&old.id).await.is_err());
        assert!(store.get(&fresh.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_respects_retention() {
        let store = Arc::new(InMemoryStore::new());

        let mut recent = GiftPack::new("0xsender", None, now_secs() + 3600, Some("R".to_string()));
        recent.created_at = now_secs() - 3600;
        store.create(&recent).await.unwrap();

        let sweeper = DraftSweeper::new(store.clone(), SweeperConfig::default());
        assert_eq!(sweeper.sweep_once().await, 0);
    }
}
