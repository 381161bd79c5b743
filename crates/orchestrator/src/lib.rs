pub mod error;
pub mod planner;
pub mod validator;

pub use error::PlanError;
pub use planner::{LockOrchestrator, LockPlan};
pub use validator::{DraftValidator, ValidationIssue, ValidationReport};
