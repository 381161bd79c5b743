use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel contract address for the chain's native asset
pub const NATIVE_TOKEN: &str = "0x0000000000000000000000000000000000000000";

/// Asset category of a gift item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Fungible,
    NonFungible,
}

/// One asset unit inside a gift pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftItem {
    pub kind: AssetKind,

    /// Token contract address, or `NATIVE_TOKEN` for the native asset
    pub token_address: String,

    /// Token id; non-fungible items only
    pub token_id: Option<u64>,

    /// Amount in integer base units; fungible items only
    #[serde(default, with = "amount_string")]
    pub amount: Option<u128>,
}

impl GiftItem {
    pub fn fungible(token_address: impl Into<String>, amount: u128) -> Self {
        Self {
            kind: AssetKind::Fungible,
            token_address: token_address.into(),
            token_id: None,
            amount: Some(amount),
        }
    }

    pub fn non_fungible(token_address: impl Into<String>, token_id: u64) -> Self {
        Self {
            kind: AssetKind::NonFungible,
            token_address: token_address.into(),
            token_id: None,
            amount: None,
        }
        .with_token_id(token_id)
    }

    pub fn native(amount: u128) -> Self {
        Self::fungible(NATIVE_TOKEN, amount)
    }

    fn with_token_id(mut self, token_id: u64) -> Self {
        self.token_id = Some(token_id);
        self
    }

    pub fn is_native(&self) -> bool {
        self.token_address == NATIVE_TOKEN
    }

    /// Check shape invariants for the item's asset kind
    pub fn validate(&self) -> Result<(), ItemError> {
        if self.token_address.trim().is_empty() {
            return Err(ItemError::MissingTokenAddress);
        }

        match self.kind {
            AssetKind::Fungible => {
                match self.amount {
                    None => return Err(ItemError::MissingAmount),
                    Some(0) => return Err(ItemError::ZeroAmount),
                    Some(_) => {}
                }
                if self.token_id.is_some() {
                    return Err(ItemError::UnexpectedTokenId);
                }
            }
            AssetKind::NonFungible => {
                if self.token_id.is_none() {
                    return Err(ItemError::MissingTokenId);
                }
                if self.amount.is_some() {
                    return Err(ItemError::UnexpectedAmount);
                }
                if self.is_native() {
                    return Err(ItemError::NativeMustBeFungible);
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ItemError {
    #[error("item has no token address")]
    MissingTokenAddress,

    #[error("fungible item requires an amount")]
    MissingAmount,

    #[error("fungible item amount must be greater than zero")]
    ZeroAmount,

    #[error("fungible item must not carry a token id")]
    UnexpectedTokenId,

    #[error("non-fungible item requires a token id")]
    MissingTokenId,

    #[error("non-fungible item must not carry an amount")]
    UnexpectedAmount,

    #[error("native asset items must be fungible")]
    NativeMustBeFungible,
}

/// Amounts serialize as base-unit decimal strings to survive JSON number
/// precision limits.
mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u128>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| s.parse::<u128>().map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fungible_valid() {
        assert!(GiftItem::fungible("0xtoken", 10).validate().is_ok());
        assert!(GiftItem::native(10).validate().is_ok());
    }

    #[test]
    fn test_fungible_zero_amount() {
        let item = GiftItem::fungible("0xtoken", 0);
        assert_eq!(item.validate(), Err(ItemError::ZeroAmount));
    }

    #[test]
    fn test_fungible_missing_amount() {
        let mut item = GiftItem::fungible("0xtoken", 10);
        item.amount = None;
        assert_eq!(item.validate(), Err(ItemError::MissingAmount));
    }

    #[test]
    fn test_non_fungible_requires_token_id() {
        let mut item = GiftItem::non_fungible("0xnft", 7);
        assert!(item.validate().is_ok());

        item.token_id = None;
        assert_eq!(item.validate(), Err(ItemError::MissingTokenId));
    }

    #[test]
    fn test_non_fungible_rejects_amount() {
        let mut item = GiftItem::non_fungible("0xnft", 7);
        item.amount = Some(1);
        assert_eq!(item.validate(), Err(ItemError::UnexpectedAmount));
    }

    #[test]
    fn test_native_must_be_fungible() {
        let item = GiftItem {
            kind: AssetKind::NonFungible,
            token_address: NATIVE_TOKEN.to_string(),
            token_id: Some(1),
            amount: None,
        };
        assert_eq!(item.validate(), Err(ItemError::NativeMustBeFungible));
    }

    #[test]
    fn test_empty_token_address() {
        let item = GiftItem::fungible("  ", 10);
        assert_eq!(item.validate(), Err(ItemError::MissingTokenAddress));
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let item = GiftItem::fungible("0xtoken", u128::MAX);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json["amount"],
            serde_json::Value::String(u128::MAX.to_string())
        );

        let back: GiftItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
