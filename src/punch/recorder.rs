use chrono::{Duration, Local, NaiveDate, NaiveDateTime, SubsecRound};
use sqlx::MySqlPool;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::model::punch::{Punch, PunchType};
use crate::punch::lock::EmployeeLocks;
use crate::punch::validator::{self, PunchEvent};

/// Whole seconds only. `DATETIME` columns round fractions, which could push a
/// stored punch past the cooldown boundary or into the next day.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// `[start, end)` of `date`.
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(chrono::NaiveTime::MIN);
    (start, start + Duration::days(1))
}

#[derive(sqlx::FromRow)]
struct PunchEventRow {
    #[sqlx(try_from = "String")]
    punch_type: PunchType,
    punched_at: NaiveDateTime,
}

impl From<PunchEventRow> for PunchEvent {
    fn from(row: PunchEventRow) -> Self {
        Self {
            punch_type: row.punch_type,
            punched_at: row.punched_at,
        }
    }
}

pub async fn todays_punches(
    pool: &MySqlPool,
    employee_id: u64,
    now: NaiveDateTime,
) -> Result<Vec<PunchEvent>, ApiError> {
    let (start, end) = day_bounds(now.date());

    let rows = sqlx::query_as::<_, PunchEventRow>(
        r#"
        SELECT punch_type, punched_at
        FROM punches
        WHERE employee_id = ?
        AND punched_at >= ?
        AND punched_at < ?
        ORDER BY punched_at ASC, id ASC
        "#,
    )
    .bind(employee_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load today's punches"))?;

    Ok(rows.into_iter().map(PunchEvent::from).collect())
}

async fn insert_punch(
    pool: &MySqlPool,
    employee_id: u64,
    punch_type: PunchType,
    punched_at: NaiveDateTime,
) -> Result<Punch, ApiError> {
    let punched_at = punched_at.trunc_subsecs(0);
    let result = sqlx::query(
        r#"
        INSERT INTO punches (employee_id, punch_type, punched_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(punch_type.as_ref())
    .bind(punched_at)
    .execute(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to insert punch"))?;

    Ok(Punch {
        id: result.last_insert_id(),
        employee_id,
        punch_type,
        punched_at,
    })
}

/// Validated path used by self-service and kiosk punches.
///
/// The employee's lock is held from loading today's punches until the insert
/// completes, so two concurrent requests cannot both validate against the same
/// last punch.
pub async fn record_punch(
    pool: &MySqlPool,
    locks: &EmployeeLocks,
    employee_id: u64,
    raw_type: &str,
    now: NaiveDateTime,
) -> Result<Punch, ApiError> {
    let lock = locks.handle(employee_id);
    let _guard = lock.lock().await;

    let today = todays_punches(pool, employee_id, now).await?;
    debug!(employee_id, existing = today.len(), "Validating punch");

    let punch_type = validator::validate(&today, raw_type, now).map_err(|rejection| {
        info!(employee_id, proposed = raw_type, reason = %rejection, "Punch rejected");
        rejection
    })?;

    let punch = insert_punch(pool, employee_id, punch_type, now).await?;
    info!(employee_id, punch_id = punch.id, punch_type = %punch_type, "Punch recorded");
    Ok(punch)
}

/// Admin path. Skips sequencing entirely; the caller chooses the timestamp.
pub async fn record_privileged_punch(
    pool: &MySqlPool,
    admin_id: u64,
    employee_id: u64,
    punch_type: PunchType,
    punched_at: NaiveDateTime,
) -> Result<Punch, ApiError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_one(pool)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up employee"))?;

    if exists == 0 {
        return Err(ApiError::NotFound("Employee not found"));
    }

    let punch = insert_punch(pool, employee_id, punch_type, punched_at).await?;
    info!(
        admin_id,
        employee_id,
        punch_id = punch.id,
        punch_type = %punch_type,
        "Manual punch recorded"
    );
    Ok(punch)
}

pub async fn edit_punch(
    pool: &MySqlPool,
    punch_id: u64,
    punch_type: Option<PunchType>,
    punched_at: Option<NaiveDateTime>,
) -> Result<Punch, ApiError> {
    if punch_type.is_none() && punched_at.is_none() {
        return Err(ApiError::BadRequest("No fields provided for update".into()));
    }

    let result = sqlx::query(
        r#"
        UPDATE punches
        SET punch_type = COALESCE(?, punch_type),
            punched_at = COALESCE(?, punched_at)
        WHERE id = ?
        "#,
    )
    .bind(punch_type.map(|t| t.as_ref().to_string()))
    .bind(punched_at.map(|t| t.trunc_subsecs(0)))
    .bind(punch_id)
    .execute(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update punch"))?;

    // MySQL reports 0 affected rows when the values did not change, so look
    // the row up instead of trusting rows_affected().
    let punch = sqlx::query_as::<_, Punch>(
        "SELECT id, employee_id, punch_type, punched_at FROM punches WHERE id = ?",
    )
    .bind(punch_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to reload punch"))?
    .ok_or(ApiError::NotFound("Punch not found"))?;

    debug!(punch_id, rows = result.rows_affected(), "Punch edited");
    Ok(punch)
}

pub async fn delete_punch(pool: &MySqlPool, punch_id: u64) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM punches WHERE id = ?")
        .bind(punch_id)
        .execute(pool)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete punch"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Punch not found"));
    }

    info!(punch_id, "Punch deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bounds_cover_whole_day() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start.to_string(), "2026-12-31 00:00:00");
        assert_eq!(end.to_string(), "2027-01-01 00:00:00");
    }

    #[test]
    fn test_row_maps_into_event() {
        let punched_at = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let event = PunchEvent::from(PunchEventRow {
            punch_type: PunchType::BreakOut,
            punched_at,
        });
        assert_eq!(
            event,
            PunchEvent {
                punch_type: PunchType::BreakOut,
                punched_at,
            }
        );
    }

    #[test]
    fn test_local_now_has_no_fraction() {
        use chrono::Timelike;
        assert_eq!(local_now().nanosecond(), 0);
    }

    #[test]
    fn test_late_punch_stays_on_its_day() {
        let late = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 600)
            .unwrap()
            .trunc_subsecs(0);
        let (start, end) = day_bounds(late.date());
        assert!(late >= start && late < end);
        assert_eq!(late.to_string(), "2026-03-02 23:59:59");
    }

    #[test]
    fn test_whole_second_gap_clears_cooldown() {
        let checked_in = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_milli_opt(10, 0, 0, 600)
            .unwrap()
            .trunc_subsecs(0);
        let now = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_milli_opt(10, 2, 0, 700)
            .unwrap()
            .trunc_subsecs(0);
        let today = [PunchEvent {
            punch_type: PunchType::CheckIn,
            punched_at: checked_in,
        }];
        assert_eq!(
            validator::validate(&today, "check_out", now),
            Ok(PunchType::CheckOut)
        );
    }
}
