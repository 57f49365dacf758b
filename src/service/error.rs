use chrono::{DateTime, FixedOffset};
use thiserror::Error;

use crate::model::access_log::ActionKind;
use crate::store::StoreError;

/// Outcomes of an access registration that are not a plain success.
/// `DuplicateAction` is an expected business outcome, not a fault; it
/// carries the prior action's localized timestamp so the terminal can tell
/// the employee what happened.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("already registered {action}; last action was at {last_at}")]
    DuplicateAction {
        action: ActionKind,
        last_at: DateTime<FixedOffset>,
    },

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Outcomes of the administrative edit paths.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Also covers cross-organization access: existence of another
    /// tenant's records is never confirmed.
    #[error("access log entry not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}
