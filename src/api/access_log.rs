use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::access_log::AccessLogEntry;
use crate::model::access_log_edit::AccessLogEdit;
use crate::service::audit::AuditService;
use crate::service::error::AuditError;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AccessLogQuery {
    /// Filter by employee ID
    #[schema(example = 7)]
    pub employee_id: Option<u64>,
    /// Inclusive start date (organization time zone)
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub from: Option<NaiveDate>,
    /// Inclusive end date (organization time zone)
    #[schema(example = "2024-01-31", value_type = String, format = "date")]
    pub to: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Pagination per page number
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AccessLogListResponse {
    pub data: Vec<AccessLogEntry>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Instant(DateTime<Utc>),
}

/// Review the organization's attendance ledger
#[utoipa::path(
    get,
    path = "/api/v1/access-logs",
    params(AccessLogQuery),
    responses(
        (status = 200, description = "Paginated ledger page", body = AccessLogListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "AccessLog"
)]
pub async fn list_access_logs(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AccessLogQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let tz = config.org_tz();
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is a valid time");

    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE organization_id = ?");
    let mut args: Vec<FilterValue> = vec![FilterValue::U64(auth.organization_id)];

    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }

    if let Some(from) = query.from {
        where_sql.push_str(" AND timestamp >= ?");
        args.push(FilterValue::Instant(tz.at(from, midnight)));
    }

    if let Some(to) = query.to {
        let day_after = to
            .succ_opt()
            .ok_or_else(|| actix_web::error::ErrorBadRequest("to date out of range"))?;
        where_sql.push_str(" AND timestamp < ?");
        args.push(FilterValue::Instant(tz.at(day_after, midnight)));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM access_logs{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Instant(v) => count_q.bind(*v),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count access logs");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT id, organization_id, employee_id, timestamp, action,
               auto_generated, edited_by_admin, edited_at, edited_by
        FROM access_logs
        {}
        ORDER BY timestamp DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, AccessLogEntry>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Instant(v) => data_q.bind(v),
        };
    }

    let entries = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch access logs");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(AccessLogListResponse {
        data: entries,
        page,
        per_page,
        total,
    }))
}

#[derive(Deserialize, ToSchema)]
pub struct EditTimeReq {
    /// New local time-of-day, 24-hour clock. The entry keeps its date.
    #[schema(example = "08:45")]
    pub new_time: String,
    #[schema(example = "Kiosk offline, employee showed security footage timestamp")]
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct EditTimeResponse {
    #[schema(example = "2024-01-02T14:00:00Z", value_type = String, format = "date-time")]
    pub previous_timestamp: DateTime<Utc>,
    #[schema(example = "2024-01-02T13:45:00Z", value_type = String, format = "date-time")]
    pub new_timestamp: DateTime<Utc>,
}

/// Correct an entry's time-of-day (audited)
#[utoipa::path(
    put,
    path = "/api/v1/access-logs/{access_log_id}/time",
    params(
        ("access_log_id" = u64, Path, description = "Ledger entry to correct")
    ),
    request_body = EditTimeReq,
    responses(
        (status = 200, description = "Entry updated, edit recorded", body = EditTimeResponse),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "field": "reason",
            "message": "must be at least 10 characters"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Entry not found", body = Object, example = json!({
            "message": "Access log entry not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "AccessLog"
)]
pub async fn edit_entry_time(
    auth: AuthUser,
    audit: web::Data<AuditService>,
    path: web::Path<u64>,
    payload: web::Json<EditTimeReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let access_log_id = path.into_inner();

    match audit
        .edit_entry_time(
            access_log_id,
            &payload.new_time,
            &payload.reason,
            auth.user_id,
            auth.organization_id,
        )
        .await
    {
        Ok(outcome) => {
            info!(
                edit_id = outcome.edit.id,
                access_log_id,
                admin = auth.user_id,
                "Entry time corrected"
            );
            Ok(HttpResponse::Ok().json(EditTimeResponse {
                previous_timestamp: outcome.previous_timestamp,
                new_timestamp: outcome.new_timestamp,
            }))
        }
        Err(AuditError::Validation { field, message }) => {
            Ok(HttpResponse::BadRequest().json(json!({
                "field": field,
                "message": message,
            })))
        }
        Err(AuditError::NotFound) => Ok(HttpResponse::NotFound().json(json!({
            "message": "Access log entry not found"
        }))),
        Err(AuditError::Storage(e)) => {
            error!(error = %e, access_log_id, "Failed to apply time edit");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// Edit history of one entry, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/access-logs/{access_log_id}/history",
    params(
        ("access_log_id" = u64, Path, description = "Ledger entry")
    ),
    responses(
        (status = 200, description = "Ordered edit history", body = [AccessLogEdit]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Entry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "AccessLog"
)]
pub async fn edit_history(
    auth: AuthUser,
    audit: web::Data<AuditService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let access_log_id = path.into_inner();

    match audit
        .edit_history(access_log_id, auth.organization_id)
        .await
    {
        Ok(history) => Ok(HttpResponse::Ok().json(history)),
        Err(AuditError::NotFound) => Ok(HttpResponse::NotFound().json(json!({
            "message": "Access log entry not found"
        }))),
        Err(AuditError::Validation { .. }) => Ok(HttpResponse::BadRequest().finish()),
        Err(AuditError::Storage(e)) => {
            error!(error = %e, access_log_id, "Failed to fetch edit history");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}
