use giftlock_types::{AssetKind, CodeHash, GiftItem};
use serde::{Deserialize, Serialize};

/// Execute messages of the escrow contract's external call surface.
///
/// The contract speaks JSON-encoded messages; `encode` produces exactly the
/// bytes a wallet or relay submits as calldata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMsg {
    CreatePack {
        code_hash: String,
        expires_at: u64,
        message: Option<String>,
    },
    AttachAsset {
        code_hash: String,
        asset_kind: AssetKind,
        token_address: String,
        token_id: Option<u64>,
        /// Base-unit amount as a decimal string; zero for non-fungibles
        amount: String,
    },
    LockPack {
        code_hash: String,
    },
    ClaimWithCode {
        code_hash: String,
        code: String,
    },
}

impl LedgerMsg {
    pub fn create_pack(code_hash: &CodeHash, expires_at: u64, message: Option<String>) -> Self {
        LedgerMsg::CreatePack {
            code_hash: code_hash.to_hex(),
            expires_at,
            message,
        }
    }

    pub fn attach_asset(code_hash: &CodeHash, item: &GiftItem) -> Self {
        LedgerMsg::AttachAsset {
            code_hash: code_hash.to_hex(),
            asset_kind: item.kind,
            token_address: item.token_address.clone(),
            token_id: item.token_id,
            amount: item.amount.unwrap_or(0).to_string(),
        }
    }

    pub fn lock_pack(code_hash: &CodeHash) -> Self {
        LedgerMsg::LockPack {
            code_hash: code_hash.to_hex(),
        }
    }

    pub fn claim_with_code(code: &str) -> Self {
        LedgerMsg::ClaimWithCode {
            code_hash: CodeHash::of(code).to_hex(),
            code: code.trim().to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        // Serialization of this enum cannot fail: no maps with non-string
        // keys, no non-finite floats.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// One step of a lock or claim plan: everything an external signer needs
/// to submit the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedCall {
    /// Escrow contract address
    pub target: String,

    pub msg: LedgerMsg,

    /// Native value to attach; non-zero only for native-asset deposits
    #[serde(with = "value_string")]
    pub value: u128,

    /// Human-readable step description for wallet UIs
    pub description: String,
}

impl PlannedCall {
    pub fn new(
        target: impl Into<String>,
        msg: LedgerMsg,
        value: u128,
        description: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            msg,
            value,
            description: description.into(),
        }
    }

    /// Hex-encoded calldata
    pub fn encoded_hex(&self) -> String {
        hex::encode(self.msg.encode())
    }
}

mod value_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}
