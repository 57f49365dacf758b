use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One administrative timestamp correction. Written immediately before the
/// ledger row is touched; append-only, never edited or deleted. Reading a
/// row's edits in `created_at` order reconstructs its full timestamp
/// history.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 5,
        "organization_id": 1,
        "access_log_id": 42,
        "admin_id": 3,
        "previous_timestamp": "2024-01-02T14:00:00Z",
        "new_timestamp": "2024-01-02T13:45:00Z",
        "reason": "Kiosk offline, employee showed security footage timestamp",
        "created_at": "2024-01-03T10:00:00Z"
    })
)]
pub struct AccessLogEdit {
    #[schema(example = 5)]
    pub id: u64,

    #[schema(example = 1)]
    pub organization_id: u64,

    #[schema(example = 42)]
    pub access_log_id: u64,

    #[schema(example = 3)]
    pub admin_id: u64,

    #[schema(example = "2024-01-02T14:00:00Z", value_type = String, format = "date-time")]
    pub previous_timestamp: DateTime<Utc>,

    #[schema(example = "2024-01-02T13:45:00Z", value_type = String, format = "date-time")]
    pub new_timestamp: DateTime<Utc>,

    #[schema(example = "Kiosk offline, employee showed security footage timestamp")]
    pub reason: String,

    #[schema(example = "2024-01-03T10:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// Data for a pending timestamp edit, validated by the audit service.
#[derive(Debug, Clone)]
pub struct NewAccessLogEdit {
    pub organization_id: u64,
    pub access_log_id: u64,
    pub admin_id: u64,
    pub previous_timestamp: DateTime<Utc>,
    pub new_timestamp: DateTime<Utc>,
    pub reason: String,
    pub edited_at: DateTime<Utc>,
}
