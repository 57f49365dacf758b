use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, warn};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::face::FaceIdentityProvider;
use crate::model::employee::Employee;
use crate::utils::{code_filter, token_cache};

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "John Doe")]
    pub display_name: String,
    /// Enrollment photo, base64-encoded JPEG/PNG
    #[schema(format = "byte")]
    pub image: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
    /// Search by code or display name
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    #[schema(example = "Johanna Doe")]
    pub display_name: Option<String>,
    #[schema(example = "inactive")]
    pub status: Option<String>,
}

/// true  => employee code AVAILABLE
/// false => employee code TAKEN
async fn is_code_available(organization_id: u64, code: &str, pool: &MySqlPool) -> bool {
    // Cuckoo filter — fast negative: if the filter has never seen the code
    // it cannot exist in the directory.
    if !code_filter::might_exist(organization_id, code) {
        return true;
    }

    // Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE organization_id = ? AND employee_code = ? LIMIT 1)",
    )
    .bind(organization_id)
    .bind(code)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

/// Enroll an employee: index the face, then create the directory record
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee enrolled", body = Object, example = json!({
            "id": 7,
            "message": "Employee enrolled successfully"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Employee code already in use"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    face: web::Data<dyn FaceIdentityProvider>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let code = payload.employee_code.trim();
    let display_name = payload.display_name.trim();

    if code.is_empty() || display_name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "employee_code and display_name must not be empty"
        })));
    }

    if !is_code_available(auth.organization_id, code, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Employee code already in use"
        })));
    }

    let image = match BASE64.decode(payload.image.as_bytes()) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        _ => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "image must be a non-empty base64 payload"
            })));
        }
    };

    // Index the face before touching the directory; an employee row
    // without a token would be unreachable from the kiosk flow.
    let face_token = match face.enroll(auth.organization_id, &image, code).await {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, organization = auth.organization_id, "Face enrollment failed");
            return Err(actix_web::error::ErrorInternalServerError(
                "Face enrollment unavailable",
            ));
        }
    };

    let result = sqlx::query(
        r#"
        INSERT INTO employees
            (organization_id, employee_code, display_name, face_token)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(auth.organization_id)
    .bind(code)
    .bind(display_name)
    .bind(&face_token)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            let employee_id = res.last_insert_id();

            code_filter::insert(auth.organization_id, code);
            token_cache::remember(auth.organization_id, &face_token, employee_id).await;

            Ok(HttpResponse::Created().json(json!({
                "id": employee_id,
                "message": "Employee enrolled successfully"
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Employee code already in use"
                    })));
                }
            }

            error!(error = %e, "Failed to create employee");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, contact your system admin"
            })))
        }
    }
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
    Owned(String),
}

#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut where_sql = String::from(" WHERE organization_id = ?");
    let mut args: Vec<FilterValue> = vec![FilterValue::U64(auth.organization_id)];

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    if let Some(search) = query.search.as_deref() {
        where_sql.push_str(" AND (employee_code LIKE ? OR display_name LIKE ?)");
        let like = format!("%{}%", search);
        args.push(FilterValue::Owned(like.clone()));
        args.push(FilterValue::Owned(like));
    }

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
            FilterValue::Owned(s) => count_q.bind(s.clone()),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count employees");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        r#"
        SELECT id, organization_id, employee_code, display_name,
               face_token, status, created_at
        FROM employees
        {}
        ORDER BY id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, Employee>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s.to_owned()),
            FilterValue::Owned(s) => data_q.bind(s),
        };
    }

    let employees = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch employees");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, organization_id, employee_code, display_name,
               face_token, status, created_at
        FROM employees
        WHERE organization_id = ? AND id = ?
        "#,
    )
    .bind(auth.organization_id)
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match employee {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// Update display name / status
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    if payload.display_name.is_none() && payload.status.is_none() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No fields provided for update"
        })));
    }

    let result = sqlx::query(
        r#"
        UPDATE employees
        SET display_name = COALESCE(?, display_name),
            status = COALESCE(?, status)
        WHERE organization_id = ? AND id = ?
        "#,
    )
    .bind(payload.display_name.as_deref())
    .bind(payload.status.as_deref())
    .bind(auth.organization_id)
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to update employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

/// Deactivate an employee and drop their face enrollment. The ledger keeps
/// its history, so the row is deactivated rather than deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee deactivated", body = Object, example = json!({
            "message": "Employee deactivated"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn deactivate_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    face: web::Data<dyn FaceIdentityProvider>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, organization_id, employee_code, display_name,
               face_token, status, created_at
        FROM employees
        WHERE organization_id = ? AND id = ?
        "#,
    )
    .bind(auth.organization_id)
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let employee = match employee {
        Some(emp) => emp,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Employee not found"
            })));
        }
    };

    // Best-effort: a dangling face in the collection cannot resolve to an
    // active employee anyway.
    if let Err(e) = face
        .forget(auth.organization_id, &employee.face_token)
        .await
    {
        warn!(error = %e, employee_id, "Failed to remove face enrollment");
    }

    sqlx::query("UPDATE employees SET status = 'inactive' WHERE organization_id = ? AND id = ?")
        .bind(auth.organization_id)
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to deactivate employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    token_cache::forget(auth.organization_id, &employee.face_token).await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deactivated"
    })))
}
