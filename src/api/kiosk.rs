use crate::{
    auth::kiosk::KioskAccess,
    error::ApiError,
    model::{employee::KioskEmployee, punch::Punch},
    punch::{
        lock::EmployeeLocks,
        recorder::{self, local_now},
    },
    utils::face_matcher::{FaceMatch, FaceMatcher, MATCH_THRESHOLD, validate_descriptor},
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlPool, types::Json};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct KioskPunch {
    /// Punch for this employee directly...
    pub employee_id: Option<u64>,
    /// ...or identify them by face descriptor.
    pub descriptor: Option<Vec<f32>>,
    #[schema(example = "check_in")]
    pub punch_type: String,
}

#[derive(Serialize, ToSchema)]
pub struct KioskPunchResponse {
    pub punch: Punch,
    pub name: String,
    /// Present when the employee was identified by face
    pub distance: Option<f32>,
}

#[derive(sqlx::FromRow)]
struct EnrolledRow {
    id: u64,
    name: String,
    face_descriptor: Json<Vec<f32>>,
}

async fn enrolled_employees(pool: &MySqlPool) -> Result<Vec<KioskEmployee>, ApiError> {
    let rows = sqlx::query_as::<_, EnrolledRow>(
        r#"
        SELECT id, name, face_descriptor
        FROM employees
        WHERE face_descriptor IS NOT NULL
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load enrolled descriptors"))?;

    Ok(rows
        .into_iter()
        .map(|row| KioskEmployee {
            id: row.id,
            name: row.name,
            face_descriptor: row.face_descriptor.0,
        })
        .collect())
}

/// Malformed descriptors are a client error, not an unknown face.
fn identify(matcher: &FaceMatcher, descriptor: &[f32]) -> Result<FaceMatch, ApiError> {
    validate_descriptor(descriptor).map_err(ApiError::BadRequest)?;
    matcher
        .best_match(descriptor)
        .ok_or(ApiError::NotFound("Face not recognised"))
}

/// Enrolled employees and their descriptors
#[utoipa::path(
    get,
    path = "/kiosk/employees",
    responses(
        (status = 200, description = "Enrolled employees", body = [KioskEmployee]),
        (status = 401, description = "Missing or invalid kiosk key"),
        (status = 503, description = "Kiosk mode disabled")
    ),
    params(("X-Kiosk-Key" = String, Header, description = "Kiosk shared key")),
    tag = "Kiosk"
)]
pub async fn kiosk_employees(
    _kiosk: KioskAccess,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    Ok(HttpResponse::Ok().json(enrolled_employees(pool.get_ref()).await?))
}

/// Punch from a kiosk, by employee id or by face
#[utoipa::path(
    post,
    path = "/kiosk/punch",
    request_body = KioskPunch,
    responses(
        (status = 201, description = "Punch recorded", body = KioskPunchResponse),
        (status = 400, description = "Punch rejected, malformed descriptor or no employee given"),
        (status = 401, description = "Missing or invalid kiosk key"),
        (status = 404, description = "Face not recognised or unknown employee"),
        (status = 503, description = "Kiosk mode disabled")
    ),
    params(("X-Kiosk-Key" = String, Header, description = "Kiosk shared key")),
    tag = "Kiosk"
)]
#[instrument(name = "kiosk_punch", skip_all)]
pub async fn kiosk_punch(
    _kiosk: KioskAccess,
    pool: web::Data<MySqlPool>,
    locks: web::Data<EmployeeLocks>,
    payload: web::Json<KioskPunch>,
) -> Result<impl Responder, ApiError> {
    let payload = payload.into_inner();

    let (employee_id, name, distance) = match (payload.employee_id, payload.descriptor) {
        (Some(id), _) => {
            let name = sqlx::query_scalar::<_, String>("SELECT name FROM employees WHERE id = ?")
                .bind(id)
                .fetch_optional(pool.get_ref())
                .await
                .map_err(|e| ApiError::internal(e, "Failed to look up employee"))?
                .ok_or(ApiError::NotFound("Employee not found"))?;
            (id, name, None)
        }
        (None, Some(descriptor)) => {
            let enrolled = enrolled_employees(pool.get_ref()).await?;
            let matcher = FaceMatcher::new(
                enrolled.iter().map(|e| (e.id, e.face_descriptor.clone())),
                MATCH_THRESHOLD,
            );
            if matcher.is_empty() {
                debug!("No enrolled faces to match against");
            }
            let FaceMatch {
                employee_id,
                distance,
            } = identify(&matcher, &descriptor)?;
            let name = enrolled
                .iter()
                .find(|e| e.id == employee_id)
                .map(|e| e.name.clone())
                .unwrap_or_default();
            (employee_id, name, Some(distance))
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "employee_id or descriptor is required".into(),
            ));
        }
    };

    let punch = recorder::record_punch(
        pool.get_ref(),
        locks.get_ref(),
        employee_id,
        &payload.punch_type,
        local_now(),
    )
    .await?;
    info!(employee_id, ?distance, "Kiosk punch recorded");

    Ok(HttpResponse::Created().json(KioskPunchResponse {
        punch,
        name,
        distance,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::face_matcher::DESCRIPTOR_LEN;
    use actix_web::{ResponseError, http::StatusCode};

    fn matcher() -> FaceMatcher {
        FaceMatcher::new([(3, vec![0.1; DESCRIPTOR_LEN])], MATCH_THRESHOLD)
    }

    #[test]
    fn test_identify_known_face() {
        let found = identify(&matcher(), &vec![0.1; DESCRIPTOR_LEN]).unwrap();
        assert_eq!(found.employee_id, 3);
    }

    #[test]
    fn test_identify_unknown_face_is_not_found() {
        let err = identify(&matcher(), &vec![0.9; DESCRIPTOR_LEN]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_identify_malformed_descriptor_is_bad_request() {
        let short = identify(&matcher(), &[0.1; 3]).unwrap_err();
        assert_eq!(short.status_code(), StatusCode::BAD_REQUEST);

        let mut nan = vec![0.1; DESCRIPTOR_LEN];
        nan[7] = f32::NAN;
        let err = identify(&matcher(), &nan).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
