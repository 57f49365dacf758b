use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;

/// What the employee asked the terminal to record.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ActionKind {
    CheckIn,
    CheckOut,
}

/// One row of an employee's attendance ledger. Rows are appended by the
/// state machine and never deleted; `timestamp` is only ever mutated by the
/// audited admin edit path.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 42,
        "organization_id": 1,
        "employee_id": 7,
        "timestamp": "2024-01-02T14:00:00Z",
        "action": "check_in",
        "auto_generated": false,
        "edited_by_admin": false,
        "edited_at": null,
        "edited_by": null
    })
)]
pub struct AccessLogEntry {
    #[schema(example = 42)]
    pub id: u64,

    #[schema(example = 1)]
    pub organization_id: u64,

    #[schema(example = 7)]
    pub employee_id: u64,

    /// Stored in UTC, interpreted in the organization time zone.
    #[schema(example = "2024-01-02T14:00:00Z", value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,

    pub action: ActionKind,

    /// True when this row was synthesized by cross-day reconciliation.
    #[schema(example = false)]
    pub auto_generated: bool,

    #[schema(example = false)]
    pub edited_by_admin: bool,

    #[schema(example = "2024-01-03T10:00:00Z", value_type = Option<String>, format = "date-time")]
    pub edited_at: Option<DateTime<Utc>>,

    #[schema(example = 3)]
    pub edited_by: Option<u64>,
}

/// A ledger row about to be appended (no id yet).
#[derive(Debug, Clone)]
pub struct NewAccessLog {
    pub organization_id: u64,
    pub employee_id: u64,
    pub timestamp: DateTime<Utc>,
    pub action: ActionKind,
    pub auto_generated: bool,
}
