use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

use crate::model::role::Role;

/// Row as stored in `employees`. Never serialized: it carries the password hash.
#[derive(Debug, sqlx::FromRow)]
pub struct EmployeeRow {
    pub id: u64,
    pub name: String,
    pub login_id: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub face_descriptor: Option<Json<Vec<f32>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "name": "Ana Ruiz",
        "login_id": "40123456",
        "role": "employee",
        "has_face": true
    })
)]
pub struct Employee {
    #[schema(example = 7)]
    pub id: u64,

    #[schema(example = "Ana Ruiz")]
    pub name: String,

    #[schema(example = "40123456")]
    pub login_id: String,

    pub role: Role,

    /// Whether a face descriptor is enrolled for kiosk punching
    pub has_face: bool,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            login_id: row.login_id,
            role: row.role,
            has_face: row.face_descriptor.is_some(),
        }
    }
}

/// Descriptor entry served to kiosks.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KioskEmployee {
    pub id: u64,
    pub name: String,
    pub face_descriptor: Vec<f32>,
}
