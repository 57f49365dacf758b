use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::service::report::{compute_worked_hours, format_duration};
use crate::store::LedgerStore;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct WorkedHoursQuery {
    #[schema(example = 7)]
    pub employee_id: u64,
    /// Inclusive start date (organization time zone)
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub from: NaiveDate,
    /// Inclusive end date (organization time zone)
    #[schema(example = "2024-01-31", value_type = String, format = "date")]
    pub to: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct DayWorkedView {
    #[schema(example = "2024-01-02", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = 28800)]
    pub seconds: i64,
    #[schema(example = "8h00m")]
    pub formatted: String,
}

#[derive(Serialize, ToSchema)]
pub struct WorkedHoursResponse {
    #[schema(example = 28800)]
    pub total_seconds: i64,
    #[schema(example = "8h00m")]
    pub total: String,
    #[schema(example = 2)]
    pub pair_count: usize,
    /// Entries that could not be paired into a worked interval
    #[schema(example = 0)]
    pub incomplete_count: usize,
    pub per_day: Vec<DayWorkedView>,
}

/// Worked hours for one employee over a date range
#[utoipa::path(
    get,
    path = "/api/v1/reports/worked-hours",
    params(WorkedHoursQuery),
    responses(
        (status = 200, description = "Aggregated worked hours", body = WorkedHoursResponse),
        (status = 400, description = "Invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn worked_hours(
    auth: AuthUser,
    ledger: web::Data<dyn LedgerStore>,
    config: web::Data<Config>,
    query: web::Query<WorkedHoursQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if query.from > query.to {
        return Err(actix_web::error::ErrorBadRequest(
            "from must not be after to",
        ));
    }

    let tz = config.org_tz();
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is a valid time");
    let day_after = query
        .to
        .succ_opt()
        .ok_or_else(|| actix_web::error::ErrorBadRequest("to date out of range"))?;

    let entries = ledger
        .entries_in_range(
            auth.organization_id,
            query.employee_id,
            tz.at(query.from, midnight),
            tz.at(day_after, midnight),
        )
        .await
        .map_err(|e| {
            error!(error = %e, employee_id = query.employee_id, "Failed to fetch ledger range");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let report = compute_worked_hours(&entries, &tz);

    Ok(HttpResponse::Ok().json(WorkedHoursResponse {
        total: format_duration(report.total_seconds),
        total_seconds: report.total_seconds,
        pair_count: report.pair_count,
        incomplete_count: report.incomplete_count,
        per_day: report
            .per_day
            .into_iter()
            .map(|day| DayWorkedView {
                formatted: format_duration(day.seconds),
                date: day.date,
                seconds: day.seconds,
            })
            .collect(),
    }))
}
