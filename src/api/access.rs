use actix_web::{HttpResponse, Responder, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::face::FaceIdentityProvider;
use crate::model::access_log::{AccessLogEntry, ActionKind};
use crate::model::employee::Employee;
use crate::service::attendance::AttendanceService;
use crate::service::error::AccessError;
use crate::store::EmployeeStore;
use crate::utils::token_cache;

#[derive(Deserialize, ToSchema)]
pub struct VerifyAccessRequest {
    /// Captured frame from the liveness widget, base64-encoded JPEG/PNG.
    #[schema(format = "byte")]
    pub image: String,

    #[schema(example = "check_in")]
    pub action: ActionKind,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyAccessResponse {
    pub employee: Employee,
    pub entry: AccessLogEntry,
    /// True when a forgotten check-out from a previous day was synthesized
    /// before this entry.
    #[schema(example = false)]
    pub auto_close_generated: bool,
}

/// Face-verified check-in / check-out
#[utoipa::path(
    post,
    path = "/api/v1/access/verify",
    request_body = VerifyAccessRequest,
    responses(
        (status = 200, description = "Access registered", body = VerifyAccessResponse),
        (status = 400, description = "Malformed image payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Face not recognized or employee not enrolled", body = Object, example = json!({
            "message": "Face not recognized"
        })),
        (status = 409, description = "Duplicate action", body = Object, example = json!({
            "message": "Already registered check_in; last action was at 2024-01-02 09:00"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Access"
)]
pub async fn verify_access(
    auth: AuthUser,
    face: web::Data<dyn FaceIdentityProvider>,
    directory: web::Data<dyn EmployeeStore>,
    attendance: web::Data<AttendanceService>,
    payload: web::Json<VerifyAccessRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_kiosk_or_admin()?;

    let image = match BASE64.decode(payload.image.as_bytes()) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        _ => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "image must be a non-empty base64 payload"
            })));
        }
    };

    // 1. Resolve identity against the face service
    let face_match = match face.identify(auth.organization_id, &image).await {
        Ok(Some(m)) => {
            tracing::debug!(similarity = m.similarity, "Face matched");
            m
        }
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Face not recognized"
            })));
        }
        Err(e) => {
            error!(error = %e, organization = auth.organization_id, "Face identification failed");
            return Err(actix_web::error::ErrorInternalServerError(
                "Face verification unavailable",
            ));
        }
    };

    // 2. Directory lookup, cache first
    let employee = match resolve_employee(
        directory.get_ref(),
        auth.organization_id,
        &face_match.face_token,
    )
    .await
    {
        Ok(Some(employee)) => employee,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "No enrolled employee matches this face"
            })));
        }
        Err(e) => {
            error!(error = %e, "Employee directory lookup failed");
            return Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ));
        }
    };

    if employee.status != "active" {
        return Ok(HttpResponse::Forbidden().json(json!({
            "message": "Employee is inactive"
        })));
    }

    // 3. Run the attendance decision
    match attendance.register_access(&employee, payload.action).await {
        Ok(result) => {
            info!(
                employee = employee.id,
                terminal = %auth.username,
                action = %payload.action,
                auto_close = result.auto_close_generated,
                "Access registered"
            );
            Ok(HttpResponse::Ok().json(VerifyAccessResponse {
                employee,
                entry: result.entry,
                auto_close_generated: result.auto_close_generated,
            }))
        }
        Err(AccessError::DuplicateAction { action, last_at }) => {
            Ok(HttpResponse::Conflict().json(json!({
                "message": format!(
                    "Already registered {}; last action was at {}",
                    action,
                    last_at.format("%Y-%m-%d %H:%M")
                ),
                "last_action": action,
                "last_at": last_at.to_rfc3339(),
            })))
        }
        Err(AccessError::Storage(e)) => {
            error!(error = %e, employee = employee.id, "Access registration failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Cache-first face-token resolution. Cache hits are re-fetched by id so a
/// stale mapping can never bypass the directory.
async fn resolve_employee(
    directory: &dyn EmployeeStore,
    organization_id: u64,
    face_token: &str,
) -> Result<Option<Employee>, crate::store::StoreError> {
    if let Some(employee_id) = token_cache::lookup(organization_id, face_token).await {
        match directory.find_by_id(organization_id, employee_id).await? {
            Some(employee) => return Ok(Some(employee)),
            None => {
                warn!(employee_id, "Cached face token no longer resolves; dropping");
                token_cache::forget(organization_id, face_token).await;
            }
        }
    }

    let employee = directory
        .find_by_face_token(organization_id, face_token)
        .await?;

    if let Some(employee) = &employee {
        token_cache::remember(organization_id, face_token, employee.id).await;
    }

    Ok(employee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    // Each test uses its own organization id: the token cache is a
    // process-wide static shared between parallel tests.
    fn employee(organization_id: u64, id: u64, token: &str) -> Employee {
        Employee {
            id,
            organization_id,
            employee_code: format!("EMP-{:03}", id),
            display_name: "Marta Rojas".into(),
            face_token: token.into(),
            status: "active".into(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let store = MemoryStore::new();

        let resolved = resolve_employee(&store, 901, "tok-unknown").await.unwrap();

        assert!(resolved.is_none());
        assert_eq!(token_cache::lookup(901, "tok-unknown").await, None);
    }

    #[tokio::test]
    async fn directory_hit_is_remembered_in_the_cache() {
        let store = MemoryStore::new().with_employee(employee(902, 5, "tok-5"));

        let resolved = resolve_employee(&store, 902, "tok-5").await.unwrap().unwrap();
        assert_eq!(resolved.id, 5);
        assert_eq!(token_cache::lookup(902, "tok-5").await, Some(5));

        // Second resolution goes through the cached id.
        let again = resolve_employee(&store, 902, "tok-5").await.unwrap().unwrap();
        assert_eq!(again.id, 5);
    }

    #[tokio::test]
    async fn stale_cache_entry_falls_back_to_the_directory() {
        let store = MemoryStore::new().with_employee(employee(903, 5, "tok-5"));

        // Poisoned mapping pointing at an id that no longer exists.
        token_cache::remember(903, "tok-5", 999).await;

        let resolved = resolve_employee(&store, 903, "tok-5").await.unwrap().unwrap();
        assert_eq!(resolved.id, 5);
        assert_eq!(token_cache::lookup(903, "tok-5").await, Some(5));
    }
}
