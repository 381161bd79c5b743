use giftlock_types::{ItemError, PackStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("gift pack not found: {0}")]
    NotFound(String),

    #[error("duplicate pack id: {0}")]
    DuplicateId(String),

    #[error("gift code already in use")]
    CodeConflict,

    #[error("pack {pack_id} is {status}, operation requires a draft")]
    NotDraft { pack_id: String, status: PackStatus },

    #[error("pack {pack_id}: illegal transition {from} -> {to}")]
    InvalidTransition {
        pack_id: String,
        from: PackStatus,
        to: PackStatus,
    },

    #[error("pack {pack_id} has no item at index {index}")]
    ItemNotFound { pack_id: String, index: usize },

    #[error("invalid item: {0}")]
    InvalidItem(#[from] ItemError),

    #[error("claim task not found: {0}")]
    TaskNotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("connection error: {0}")]
    Connection(String),
}
