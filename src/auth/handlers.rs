use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    models::{LoginReqDto, RegisterReq, TokenType, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Bootstrap an organization together with its first admin account.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Organization and admin created", body = Object, example = json!({
            "message": "Organization registered successfully"
        })),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn register(
    payload: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> impl Responder {
    let username = payload.username.trim();
    let organization_name = payload.organization_name.trim();

    if username.is_empty() || payload.password.is_empty() || organization_name.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Organization name, username and password must not be empty"
        }));
    }

    let hashed = hash_password(&payload.password);

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            error!(error = %e, "Failed to open transaction for registration");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let org_id = match sqlx::query("INSERT INTO organizations (name) VALUES (?)")
        .bind(organization_name)
        .execute(&mut *tx)
        .await
    {
        Ok(result) => result.last_insert_id(),
        Err(e) => {
            error!(error = %e, "Failed to create organization");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (organization_id, username, password, role_id)
        VALUES (?, ?, ?, 1)
        "#,
    )
    .bind(org_id)
    .bind(username)
    .bind(&hashed)
    .execute(&mut *tx)
    .await;

    if let Err(e) = result {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return HttpResponse::Conflict().json(json!({
                    "error": "Username already exists"
                }));
            }
        }
        error!(error = %e, "Failed to create admin user");
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = tx.commit().await {
        error!(error = %e, "Failed to commit registration");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Created().json(json!({
        "message": "Organization registered successfully"
    }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    // 1. Basic validation
    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().body("Username or password required");
    }

    debug!("Fetching user from database");

    // 2. Fetch user
    let db_user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, organization_id, username, password, role_id, employee_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&user.username)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "User found");
            user
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    // 3. Verify password
    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username.clone(),
        role: db_user.role_id,
        organization_id: db_user.organization_id,
        employee_id: db_user.employee_id,
    };

    // 4. Generate tokens
    let access_token = generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl);
    let (refresh_token, refresh_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl);

    // 5. Store refresh token
    debug!(
        user_id = db_user.id,
        jti = %refresh_claims.jti,
        "Storing refresh token"
    );

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(db_user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    // 6. Update last_login_at (non-fatal)
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    })
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair issued", body = LoginResponse),
        (status = 401, description = "Invalid or revoked refresh token")
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::Unauthorized().body("No token"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::Unauthorized().finish();
    }

    // Find the refresh token in the DB
    let record = match sqlx::query_as::<_, (u64, u64, bool)>(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to fetch refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (record_id, record_user_id) = match record {
        Some((id, user_id, revoked)) if !revoked => (id, user_id),
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // Revoke the old refresh token
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let subject = TokenSubject {
        user_id: claims.user_id,
        username: claims.sub.clone(),
        role: claims.role,
        organization_id: claims.organization_id,
        employee_id: claims.employee_id,
    };

    // Issue a new rotating refresh token
    let (new_refresh_token, new_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl);

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(record_user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store rotated refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let access_token = generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl);

    HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Refresh token revoked (idempotent)")
    ),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // Only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // Revoke refresh token (idempotent)
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    // Success even if the token didn't exist
    HttpResponse::NoContent().finish()
}

#[derive(Deserialize, ToSchema)]
pub struct ProvisionKioskReq {
    /// Human label for the terminal, e.g. "Lobby entrance"
    #[schema(example = "Lobby entrance")]
    pub label: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct KioskCredentials {
    #[schema(example = "kiosk-9f3a2b1c")]
    pub username: String,
    /// Shown exactly once; only the hash is stored.
    pub password: String,
}

/// Provision a kiosk terminal account for the admin's organization.
#[utoipa::path(
    post,
    path = "/api/v1/kiosks",
    request_body = ProvisionKioskReq,
    responses(
        (status = 201, description = "Kiosk account created", body = KioskCredentials),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Kiosk"
)]
pub async fn provision_kiosk(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ProvisionKioskReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let suffix = Uuid::new_v4().to_string();
    let username = format!("kiosk-{}", &suffix[..8]);
    let password = Uuid::new_v4().to_string();
    let hashed = hash_password(&password);

    sqlx::query(
        r#"
        INSERT INTO users (organization_id, username, password, role_id)
        VALUES (?, ?, ?, 3)
        "#,
    )
    .bind(auth.organization_id)
    .bind(&username)
    .bind(&hashed)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to provision kiosk account");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    info!(
        admin = auth.user_id,
        kiosk = %username,
        label = payload.label.as_deref().unwrap_or("-"),
        "Kiosk terminal provisioned"
    );

    Ok(HttpResponse::Created().json(KioskCredentials { username, password }))
}
