use giftlock_types::{GiftPack, ItemError, PackStatus};
use serde::Serialize;
use thiserror::Error;

/// One problem found in a draft
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("pack is {status}, locking requires a draft")]
    WrongStatus { status: PackStatus },

    #[error("pack has no items")]
    NoItems,

    #[error("expiry {expires_at} is not in the future")]
    ExpiryInPast { expires_at: u64 },

    #[error("pack has no gift code")]
    MissingGiftCode,

    #[error("gift code must not be all digits")]
    NumericGiftCode,

    #[error("item {index}: {source}")]
    BadItem {
        index: usize,
        #[source]
        source: ItemError,
    },
}

/// Outcome of validating a draft: valid exactly when no issues were found.
/// All checks run; the report carries every issue, not just the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Checks a draft pack against the lock-plan preconditions
#[derive(Debug, Default, Clone)]
pub struct DraftValidator;

impl DraftValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate for locking. `Draft` and `LockPending` are both lockable
    /// (re-planning a partially executed plan is legal); anything further
    /// along is not.
    pub fn validate(&self, pack: &GiftPack, current_time: u64) -> ValidationReport {
        let mut report = ValidationReport::default();

        if !matches!(pack.status, PackStatus::Draft | PackStatus::LockPending) {
            report.errors.push(ValidationIssue::WrongStatus {
                status: pack.status,
            });
        }

        if pack.items.is_empty() {
            report.errors.push(ValidationIssue::NoItems);
        }

        if pack.expires_at <= current_time {
            report.errors.push(ValidationIssue::ExpiryInPast {
                expires_at: pack.expires_at,
            });
        }

        match pack.trimmed_code() {
            None => report.errors.push(ValidationIssue::MissingGiftCode),
            Some(code) if code.chars().all(|c| c.is_ascii_digit()) => {
                // All-digit codes would collide with numeric on-chain
                // references in the claim lookup namespace
                report.errors.push(ValidationIssue::NumericGiftCode);
            }
            Some(_) => {}
        }

        for (index, item) in pack.items.iter().enumerate() {
            if let Err(source) = item.validate() {
                report.errors.push(ValidationIssue::BadItem { index, source });
            }
        }

        report
    }
}
