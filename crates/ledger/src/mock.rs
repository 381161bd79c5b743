use async_trait::async_trait;
use giftlock_types::{now_secs, AssetKind, CodeHash};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{EscrowLedger, LedgerError, LedgerMsg, LedgerQuery, LockProgress, PlannedCall};

/// One attached asset on the mock chain
#[derive(Debug, Clone)]
struct MockAsset {
    #[allow(dead_code)]
    kind: AssetKind,
    token_address: String,
    token_id: Option<u64>,
    amount: u128,
}

/// On-chain pack state tracked by the mock
#[derive(Debug, Clone)]
struct MockPack {
    chain_ref: u64,
    #[allow(dead_code)]
    code_hash: String,
    sender: String,
    expires_at: u64,
    #[allow(dead_code)]
    message: Option<String>,
    assets: Vec<MockAsset>,
    locked: bool,
    claimed: bool,
}

#[derive(Debug, Default)]
struct MockState {
    /// code hash hex -> pack
    packs: HashMap<String, MockPack>,
    next_ref: u64,
    next_tx: u64,
    paused: bool,
    active_until: Option<u64>,
    /// read shapes the "contract version" no longer answers
    disabled_queries: HashSet<&'static str>,
    fail_with_network: bool,
}

/// In-memory escrow contract for exercising the protocol without a chain.
///
/// Supports the full call surface, the pause/active-window gate, legacy
/// read-shape toggles for fallback tests, and a scripted network failure.
#[derive(Clone)]
pub struct MockLedger {
    address: String,
    state: Arc<RwLock<MockState>>,
}

impl MockLedger {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: Arc::new(RwLock::new(MockState {
                next_ref: 1,
                next_tx: 1,
                ..Default::default()
            })),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn set_paused(&self, paused: bool) {
        self.state.write().await.paused = paused;
    }

    pub async fn set_active_until(&self, until: Option<u64>) {
        self.state.write().await.active_until = until;
    }

    pub async fn set_fail_with_network(&self, fail: bool) {
        self.state.write().await.fail_with_network = fail;
    }

    /// Make a read shape stop answering, as an older contract would.
    pub async fn disable_query(&self, shape: &'static str) {
        self.state.write().await.disabled_queries.insert(shape);
    }

    /// Push a pack's expiry into the past, simulating elapsed chain time.
    pub async fn expire_pack(&self, code: &str) {
        let mut state = self.state.write().await;
        if let Some(pack) = state.packs.get_mut(&CodeHash::of(code).to_hex()) {
            pack.expires_at = now_secs().saturating_sub(1);
        }
    }

    pub async fn chain_ref_of(&self, code_hash: &CodeHash) -> Option<u64> {
        self.state
            .read()
            .await
            .packs
            .get(&code_hash.to_hex())
            .map(|p| p.chain_ref)
    }

    fn check_gate(state: &MockState) -> Result<(), LedgerError> {
        if state.fail_with_network {
            return Err(LedgerError::Network("simulated outage".to_string()));
        }
        if state.paused {
            return Err(LedgerError::Paused);
        }
        if let Some(until) = state.active_until {
            if now_secs() >= until {
                return Err(LedgerError::ActiveWindowClosed { until });
            }
        }
        Ok(())
    }

    fn pack_by_ref(state: &MockState, pack_id: u64) -> Result<&MockPack, LedgerError> {
        state
            .packs
            .values()
            .find(|p| p.chain_ref == pack_id)
            .ok_or_else(|| LedgerError::PackNotFound(pack_id.to_string()))
    }

    fn primary_asset(pack: &MockPack) -> (String, Option<u64>, u128) {
        match pack.assets.first() {
            Some(asset) => (asset.token_address.clone(), asset.token_id, asset.amount),
            None => (String::new(), None, 0),
        }
    }
}

#[async_trait]
impl EscrowLedger for MockLedger {
    async fn query_pack(&self, query: LedgerQuery) -> Result<serde_json::Value, LedgerError> {
        let state = self.state.read().await;
        Self::check_gate(&state)?;

        match query {
            LedgerQuery::PackState { pack_id } => {
                if state.disabled_queries.contains("pack_state") {
                    return Err(LedgerError::Reverted("unknown query: pack_state".into()));
                }
                let pack = Self::pack_by_ref(&state, pack_id)?;
                let (token_address, token_id, amount) = Self::primary_asset(pack);
                Ok(json!({
                    "token_address": token_address,
                    "token_id": token_id,
                    "amount": amount.to_string(),
                    "sender": pack.sender,
                    "expires_at": pack.expires_at,
                    "claimed": pack.claimed,
                }))
            }
            LedgerQuery::PackInfo { pack_id } => {
                if state.disabled_queries.contains("pack_info") {
                    return Err(LedgerError::Reverted("unknown query: pack_info".into()));
                }
                let pack = Self::pack_by_ref(&state, pack_id)?;
                let (token_address, token_id, amount) = Self::primary_asset(pack);
                Ok(json!({
                    "token": {
                        "address": token_address,
                        "id": token_id,
                        "amount": amount.to_string(),
                    },
                    "owner": pack.sender,
                    "expiry": pack.expires_at,
                    "is_claimed": pack.claimed,
                }))
            }
            LedgerQuery::LegacyPack { pack_id } => {
                if state.disabled_queries.contains("legacy_pack") {
                    return Err(LedgerError::Reverted("unknown query: legacy_pack".into()));
                }
                let pack = Self::pack_by_ref(&state, pack_id)?;
                let (token_address, token_id, amount) = Self::primary_asset(pack);
                Ok(json!([
                    token_address,
                    token_id,
                    amount.to_string(),
                    pack.sender,
                    pack.expires_at,
                    pack.claimed,
                ]))
            }
            LedgerQuery::LockProgress { code_hash } => {
                let progress = match state.packs.get(&code_hash) {
                    Some(pack) => LockProgress {
                        created: true,
                        attached_count: pack.assets.len(),
                        locked: pack.locked,
                        chain_ref: Some(pack.chain_ref),
                    },
                    None => LockProgress::default(),
                };
                serde_json::to_value(progress).map_err(|e| LedgerError::Decode(e.to_string()))
            }
        }
    }

    async fn lock_progress(&self, code_hash: &CodeHash) -> Result<LockProgress, LedgerError> {
        let value = self
            .query_pack(LedgerQuery::LockProgress {
                code_hash: code_hash.to_hex(),
            })
            .await?;
        serde_json::from_value(value).map_err(|e| LedgerError::Decode(e.to_string()))
    }

    async fn execute(&self, call: &PlannedCall, sender: &str) -> Result<String, LedgerError> {
        let mut state = self.state.write().await;
        Self::check_gate(&state)?;

        match &call.msg {
            LedgerMsg::CreatePack {
                code_hash,
                expires_at,
                message,
            } => {
                if state.packs.contains_key(code_hash) {
                    return Err(LedgerError::Reverted("pack already exists".to_string()));
                }
                let chain_ref = state.next_ref;
                state.next_ref += 1;
                state.packs.insert(
                    code_hash.clone(),
                    MockPack {
                        chain_ref,
                        code_hash: code_hash.clone(),
                        sender: sender.to_string(),
                        expires_at: *expires_at,
                        message: message.clone(),
                        assets: Vec::new(),
                        locked: false,
                        claimed: false,
                    },
                );
            }
            LedgerMsg::AttachAsset {
                code_hash,
                asset_kind,
                token_address,
                token_id,
                amount,
            } => {
                let amount: u128 = amount
                    .parse()
                    .map_err(|_| LedgerError::Reverted("bad amount".to_string()))?;
                let pack = state
                    .packs
                    .get_mut(code_hash)
                    .ok_or_else(|| LedgerError::Reverted("pack does not exist".to_string()))?;
                if pack.locked {
                    return Err(LedgerError::Reverted("pack already locked".to_string()));
                }
                pack.assets.push(MockAsset {
                    kind: *asset_kind,
                    token_address: token_address.clone(),
                    token_id: *token_id,
                    amount,
                });
            }
            LedgerMsg::LockPack { code_hash } => {
                let pack = state
                    .packs
                    .get_mut(code_hash)
                    .ok_or_else(|| LedgerError::Reverted("pack does not exist".to_string()))?;
                if pack.assets.is_empty() {
                    return Err(LedgerError::Reverted("no assets attached".to_string()));
                }
                pack.locked = true;
            }
            LedgerMsg::ClaimWithCode { code_hash, code } => {
                if &CodeHash::of(code).to_hex() != code_hash {
                    return Err(LedgerError::Reverted("code does not match hash".to_string()));
                }
                let pack = state
                    .packs
                    .get_mut(code_hash)
                    .ok_or_else(|| LedgerError::Reverted("pack does not exist".to_string()))?;
                if !pack.locked {
                    return Err(LedgerError::Reverted("pack not locked".to_string()));
                }
                if pack.claimed {
                    return Err(LedgerError::Reverted("pack already claimed".to_string()));
                }
                if now_secs() >= pack.expires_at {
                    return Err(LedgerError::Reverted("pack expired".to_string()));
                }
                pack.claimed = true;
            }
        }

        let tx = state.next_tx;
        state.next_tx += 1;
        Ok(format!("0xmock{tx:08x}"))
    }

    async fn is_connected(&self) -> bool {
        !self.state.read().await.fail_with_network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(msg: LedgerMsg) -> PlannedCall {
        PlannedCall::new("0xescrow", msg, 0, "test")
    }

    async fn create_and_lock(ledger: &MockLedger, code: &str) -> CodeHash {
        let hash = CodeHash::of(code);
        ledger
            .execute(
                &call(LedgerMsg::create_pack(&hash, now_secs() + 3600, None)),
                "0xsender",
            )
            .await
            .unwrap();
        ledger
            .execute(
                &call(LedgerMsg::attach_asset(
                    &hash,
                    &giftlock_types::GiftItem::fungible("0xtoken", 10),
                )),
                "0xsender",
            )
            .await
            .unwrap();
        ledger
            .execute(&call(LedgerMsg::lock_pack(&hash)), "0xsender")
            .await
            .unwrap();
        hash
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let ledger = MockLedger::new("0xescrow");
        let hash = create_and_lock(&ledger, "LIFE").await;

        let progress = ledger.lock_progress(&hash).await.unwrap();
        assert!(progress.created && progress.locked);
        assert_eq!(progress.attached_count, 1);

        let tx = ledger
            .execute(&call(LedgerMsg::claim_with_code("LIFE")), "0xclaimer")
            .await
            .unwrap();
        assert!(tx.starts_with("0xmock"));

        // Ledger enforces at-most-once claiming
        let again = ledger
            .execute(&call(LedgerMsg::claim_with_code("LIFE")), "0xclaimer")
            .await;
        assert!(matches!(again, Err(LedgerError::Reverted(_))));
    }

    #[tokio::test]
    async fn test_duplicate_create_reverts() {
        let ledger = MockLedger::new("0xescrow");
        let hash = CodeHash::of("DUP");
        let msg = LedgerMsg::create_pack(&hash, now_secs() + 3600, None);

        ledger.execute(&call(msg.clone()), "0xsender").await.unwrap();
        let second = ledger.execute(&call(msg), "0xsender").await;
        assert!(matches!(second, Err(LedgerError::Reverted(_))));
    }

    #[tokio::test]
    async fn test_pause_gates_every_call() {
        let ledger = MockLedger::new("0xescrow");
        let hash = create_and_lock(&ledger, "PAUSE").await;
        let chain_ref = ledger.chain_ref_of(&hash).await.unwrap();

        ledger.set_paused(true).await;

        let exec = ledger
            .execute(&call(LedgerMsg::claim_with_code("PAUSE")), "0xclaimer")
            .await;
        assert!(matches!(exec, Err(LedgerError::Paused)));

        let read = ledger
            .query_pack(LedgerQuery::PackState { pack_id: chain_ref })
            .await;
        assert!(matches!(read, Err(LedgerError::Paused)));
    }

    #[tokio::test]
    async fn test_active_window_gate() {
        let ledger = MockLedger::new("0xescrow");
        ledger.set_active_until(Some(now_secs() - 1)).await;

        let result = ledger
            .execute(
                &call(LedgerMsg::create_pack(&CodeHash::of("W"), now_secs() + 10, None)),
                "0xsender",
            )
            .await;
        assert!(matches!(
            result,
            Err(LedgerError::ActiveWindowClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_code_reverts() {
        let ledger = MockLedger::new("0xescrow");
        create_and_lock(&ledger, "RIGHT").await;

        let msg = LedgerMsg::ClaimWithCode {
            code_hash: CodeHash::of("RIGHT").to_hex(),
            code: "WRONG".to_string(),
        };
        let result = ledger.execute(&call(msg), "0xclaimer").await;
        assert!(matches!(result, Err(LedgerError::Reverted(_))));
    }

    #[tokio::test]
    async fn test_lock_requires_assets() {
        let ledger = MockLedger::new("0xescrow");
        let hash = CodeHash::of("EMPTY");
        ledger
            .execute(
                &call(LedgerMsg::create_pack(&hash, now_secs() + 3600, None)),
                "0xsender",
            )
            .await
            .unwrap();

        let result = ledger
            .execute(&call(LedgerMsg::lock_pack(&hash)), "0xsender")
            .await;
        assert!(matches!(result, Err(LedgerError::Reverted(_))));
    }
}
