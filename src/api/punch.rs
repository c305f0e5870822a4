use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::punch::{PunchLog, PunchType};
use crate::punch::lock::EmployeeLocks;
use crate::punch::recorder::{self, local_now};
use crate::punch::validator;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LOG_LIMIT: u32 = 200;
pub const MAX_LOG_LIMIT: u32 = 500;

#[derive(Deserialize, ToSchema)]
pub struct CreatePunch {
    /// One of check_in, break_out, break_in, check_out
    #[schema(example = "check_in")]
    pub punch_type: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PunchQuery {
    /// Admins only: whose punches to list. Defaults to the caller.
    pub employee_id: Option<u64>,
    /// First day included (YYYY-MM-DD)
    #[param(value_type = Option<String>, example = "2026-03-01")]
    pub start_date: Option<NaiveDate>,
    /// Last day included (YYYY-MM-DD)
    #[param(value_type = Option<String>, example = "2026-03-31")]
    pub end_date: Option<NaiveDate>,
    /// 1..=500, default 200
    pub limit: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AllowedResponse {
    pub allowed: Vec<PunchType>,
}

/// Date range and owner for a punch log query.
#[derive(Debug, Clone, Copy)]
pub struct LogFilter {
    pub employee_id: u64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl LogFilter {
    fn bounds(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        let start = self.start_date.map(|d| recorder::day_bounds(d).0);
        let end = self.end_date.map(|d| recorder::day_bounds(d).1);
        (start, end)
    }
}

pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
}

/// Newest first. `limit: None` returns every matching row.
pub async fn fetch_punch_logs(pool: &MySqlPool, filter: LogFilter) -> Result<Vec<PunchLog>, ApiError> {
    let (start, end) = filter.bounds();

    let mut sql = String::from(
        r#"
        SELECT p.id, p.employee_id, e.name AS employee, p.punch_type, p.punched_at
        FROM punches p
        JOIN employees e ON e.id = p.employee_id
        WHERE p.employee_id = ?
        "#,
    );
    if start.is_some() {
        sql.push_str(" AND p.punched_at >= ?");
    }
    if end.is_some() {
        sql.push_str(" AND p.punched_at < ?");
    }
    sql.push_str(" ORDER BY p.punched_at DESC, p.id DESC");
    if filter.limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut query = sqlx::query_as::<_, PunchLog>(&sql).bind(filter.employee_id);
    if let Some(start) = start {
        query = query.bind(start);
    }
    if let Some(end) = end {
        query = query.bind(end);
    }
    if let Some(limit) = filter.limit {
        query = query.bind(limit);
    }

    query
        .fetch_all(pool)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch punch logs"))
}

/// Punch for the logged-in employee
#[utoipa::path(
    post,
    path = "/api/punches",
    request_body = CreatePunch,
    responses(
        (status = 201, description = "Punch recorded", body = Punch),
        (status = 400, description = "Punch rejected", body = Object, example = json!({
            "message": "must wait between punches"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Punches"
)]
#[instrument(name = "self_punch", skip(auth, pool, locks, payload), fields(employee_id = auth.employee_id))]
pub async fn create_punch(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    locks: web::Data<EmployeeLocks>,
    payload: web::Json<CreatePunch>,
) -> Result<impl Responder, ApiError> {
    let punch = recorder::record_punch(
        pool.get_ref(),
        locks.get_ref(),
        auth.employee_id,
        &payload.punch_type,
        local_now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(punch))
}

/// Punch history
#[utoipa::path(
    get,
    path = "/api/punches",
    params(PunchQuery),
    responses(
        (status = 200, description = "Punches, newest first", body = [PunchLog]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Punches"
)]
pub async fn list_punches(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PunchQuery>,
) -> Result<impl Responder, ApiError> {
    // Non-admins always see their own punches.
    let employee_id = match query.employee_id {
        Some(id) if auth.is_admin() => id,
        _ => auth.employee_id,
    };

    let logs = fetch_punch_logs(
        pool.get_ref(),
        LogFilter {
            employee_id,
            start_date: query.start_date,
            end_date: query.end_date,
            limit: Some(clamp_limit(query.limit)),
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(logs))
}

/// Punch types the logged-in employee may record next
#[utoipa::path(
    get,
    path = "/api/punches/allowed",
    responses(
        (status = 200, description = "Allowed next punch types", body = AllowedResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Punches"
)]
pub async fn allowed_punches(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let today = recorder::todays_punches(pool.get_ref(), auth.employee_id, local_now()).await?;

    Ok(HttpResponse::Ok().json(AllowedResponse {
        allowed: validator::allowed_next(&today),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 200);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), 500);
        assert_eq!(clamp_limit(Some(25)), 25);
    }

    #[test]
    fn test_end_date_is_inclusive() {
        let filter = LogFilter {
            employee_id: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 31),
            limit: None,
        };
        let (start, end) = filter.bounds();
        assert_eq!(start.unwrap().to_string(), "2026-03-01 00:00:00");
        assert_eq!(
            end.unwrap() - Duration::seconds(1),
            NaiveDate::from_ymd_opt(2026, 3, 31)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap()
        );
    }
}
