use crate::{
    api::{
        employee::load_employees,
        punch::{LogFilter, fetch_punch_logs},
    },
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        employee::Employee,
        punch::{PunchLog, PunchType},
    },
    punch::recorder::{self, day_bounds, local_now},
    utils::csv_export::punches_to_csv,
};
use actix_web::{HttpResponse, Responder, http::header, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ManualPunch {
    #[schema(example = 7)]
    pub employee_id: u64,
    pub punch_type: PunchType,
    /// Defaults to now
    #[schema(value_type = Option<String>, format = "date-time", example = "2026-03-02T09:00:00")]
    pub punched_at: Option<NaiveDateTime>,
}

#[derive(Deserialize, ToSchema)]
pub struct EditPunch {
    pub punch_type: Option<PunchType>,
    #[schema(value_type = Option<String>, format = "date-time", example = "2026-03-02T09:00:00")]
    pub punched_at: Option<NaiveDateTime>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// Defaults to the caller
    pub employee_id: Option<u64>,
    #[param(value_type = Option<String>, example = "2026-03-01")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, example = "2026-03-31")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct Stats {
    pub total_employees: i64,
    pub punches_today: i64,
    pub latest_punches: Vec<PunchLog>,
    pub employees: Vec<Employee>,
}

/// Manual punch (admin). Not subject to sequencing rules.
#[utoipa::path(
    post,
    path = "/api/admin/punches",
    request_body = ManualPunch,
    responses(
        (status = 201, description = "Punch created", body = Punch),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn manual_punch(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ManualPunch>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let punch = recorder::record_privileged_punch(
        pool.get_ref(),
        auth.employee_id,
        payload.employee_id,
        payload.punch_type,
        payload.punched_at.unwrap_or_else(local_now),
    )
    .await?;

    Ok(HttpResponse::Created().json(punch))
}

/// Edit a punch (admin)
#[utoipa::path(
    put,
    path = "/api/admin/punches/{punch_id}",
    params(("punch_id" = u64, Path, description = "Punch ID")),
    request_body = EditPunch,
    responses(
        (status = 200, description = "Punch updated", body = Punch),
        (status = 400, description = "Nothing to update"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Punch not found")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn edit_punch(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<EditPunch>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let punch = recorder::edit_punch(
        pool.get_ref(),
        path.into_inner(),
        payload.punch_type,
        payload.punched_at,
    )
    .await?;

    Ok(HttpResponse::Ok().json(punch))
}

/// Delete a punch (admin)
#[utoipa::path(
    delete,
    path = "/api/admin/punches/{punch_id}",
    params(("punch_id" = u64, Path, description = "Punch ID")),
    responses(
        (status = 200, description = "Punch deleted", body = Object, example = json!({
            "message": "Punch deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Punch not found")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn delete_punch(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    recorder::delete_punch(pool.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Punch deleted"
    })))
}

/// Dashboard figures (admin)
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard figures", body = Stats),
        (status = 403, description = "Admin only")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let pool = pool.get_ref();

    let total_employees = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count employees"))?;

    let (start, end) = day_bounds(local_now().date());
    let punches_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM punches WHERE punched_at >= ? AND punched_at < ?",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to count today's punches"))?;

    let latest_punches = sqlx::query_as::<_, PunchLog>(
        r#"
        SELECT p.id, p.employee_id, e.name AS employee, p.punch_type, p.punched_at
        FROM punches p
        JOIN employees e ON e.id = p.employee_id
        ORDER BY p.punched_at DESC, p.id DESC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch latest punches"))?;

    let employees = load_employees(pool).await?;

    Ok(HttpResponse::Ok().json(Stats {
        total_employees,
        punches_today,
        latest_punches,
        employees,
    }))
}

/// Download punches as CSV (admin)
#[utoipa::path(
    get,
    path = "/api/admin/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 403, description = "Admin only")
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
pub async fn export_csv(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ExportQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let employee_id = query.employee_id.unwrap_or(auth.employee_id);
    let logs = fetch_punch_logs(
        pool.get_ref(),
        LogFilter {
            employee_id,
            start_date: query.start_date,
            end_date: query.end_date,
            limit: None,
        },
    )
    .await?;

    let body = punches_to_csv(&logs).map_err(|e| ApiError::internal(e, "Failed to render CSV"))?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"punches_{employee_id}.csv\""),
        ))
        .body(body))
}
