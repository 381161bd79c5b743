use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic one-way digest of a gift code, used as the on-chain pack
/// identifier for code-based packs.
///
/// The code is trimmed at the edges before hashing; interior whitespace and
/// case are significant. The lock and claim paths must agree on this exact
/// computation, which is why it lives here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeHash([u8; 32]);

impl CodeHash {
    pub fn of(code: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(code.trim().as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for CodeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
