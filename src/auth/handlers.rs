use crate::{
    auth::{
        auth::{AuthUser, bearer_token},
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    error::ApiError,
    model::employee::{Employee, EmployeeRow},
    models::{LoginReqDto, TokenType},
    utils::login_id_cache,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: Employee,
}

async fn store_refresh_token(
    pool: &MySqlPool,
    employee_id: u64,
    jti: &str,
    exp: usize,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (employee_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(employee_id)
    .bind(jti)
    .bind(exp as i64)
    .execute(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store refresh token"))?;
    Ok(())
}

fn issue_tokens(
    subject: &TokenSubject,
    config: &Config,
) -> Result<(String, String, crate::models::Claims), ApiError> {
    let access_token =
        generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
            .map_err(|e| ApiError::internal(e, "Failed to sign access token"))?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(|e| ApiError::internal(e, "Failed to sign refresh token"))?;
    Ok((access_token, refresh_token, refresh_claims))
}

/// Login with login id and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing login id or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(login_id = %user.login_id)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    info!("Login request received");

    let login_id = user.login_id.trim();
    if login_id.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty login id or password");
        return Err(ApiError::BadRequest(
            "Login id and password are required".into(),
        ));
    }

    debug!("Fetching employee from database");

    let db_user = sqlx::query_as::<_, EmployeeRow>(
        r#"
        SELECT id, name, login_id, password_hash, role, face_descriptor
        FROM employees
        WHERE login_id = ?
        LIMIT 1
        "#,
    )
    .bind(login_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| ApiError::internal(e, "Database error while fetching employee"))?;

    let Some(db_user) = db_user else {
        info!("Invalid credentials: employee not found");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    };

    if let Err(e) = verify_password(&user.password, &db_user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    debug!(employee_id = db_user.id, "Password verified");

    let subject = TokenSubject {
        employee_id: db_user.id,
        login_id: db_user.login_id.clone(),
        name: db_user.name.clone(),
        role: db_user.role,
    };
    let (access_token, refresh_token, refresh_claims) = issue_tokens(&subject, &config)?;

    debug!(jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool.get_ref(), db_user.id, &refresh_claims.jti, refresh_claims.exp).await?;

    if let Err(e) = sqlx::query("UPDATE employees SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        error!(error = %e, "Failed to update last_login_at");
    }
    login_id_cache::mark_taken(&db_user.login_id).await;

    info!(employee_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        user: db_user.into(),
    }))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = Object, example = json!({
            "access_token": "eyJ...",
            "refresh_token": "eyJ..."
        })),
        (status = 401, description = "Invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let token = bearer_token(&req).ok_or(ApiError::Unauthorized("No token"))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized("Invalid token type"));
    }

    // Revoke-if-active in one statement so a token can only be rotated once.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = 1
        WHERE jti = ?
        AND revoked = 0
        AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::internal(e, "Failed to revoke refresh token"))?;

    if revoked.rows_affected() == 0 {
        info!(employee_id = claims.employee_id, "Refresh token unknown or already used");
        return Err(ApiError::Unauthorized("Invalid token"));
    }

    let subject = TokenSubject::from(&claims);
    let (access_token, new_refresh_token, new_claims) = issue_tokens(&subject, &config)?;
    store_refresh_token(pool.get_ref(), subject.employee_id, &new_claims.jti, new_claims.exp).await?;

    Ok(HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    })))
}

/// Logout by revoking the refresh token. Always answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}

/// Current session
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Authenticated employee", body = Object, example = json!({
            "employee_id": 7,
            "login_id": "40123456",
            "name": "Ana Ruiz",
            "role": "employee"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn session(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "employee_id": auth.employee_id,
        "login_id": auth.login_id,
        "name": auth.name,
        "role": auth.role,
    }))
}
