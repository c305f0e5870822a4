use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::ApiError,
    model::{
        employee::{Employee, EmployeeRow},
        role::Role,
    },
    utils::{face_matcher::validate_descriptor, login_id_cache, login_id_filter},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlPool, types::Json};
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Ana Ruiz")]
    pub name: String,
    #[schema(example = "40123456")]
    pub login_id: String,
    #[schema(example = "secret")]
    pub password: String,
    /// `admin` or `employee`; anything else becomes `employee`
    #[schema(example = "employee")]
    pub role: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SaveFace {
    /// 128 values produced by the face recognition model
    pub descriptor: Vec<f32>,
}

/// true  => login id AVAILABLE
/// false => login id TAKEN
pub async fn is_login_id_available(login_id: &str, pool: &MySqlPool) -> Result<bool, ApiError> {
    // Cuckoo filter: a miss is definitive.
    if !login_id_filter::might_exist(login_id) {
        return Ok(true);
    }

    if login_id_cache::is_taken(login_id).await {
        return Ok(false);
    }

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM employees WHERE login_id = ?",
    )
    .bind(login_id)
    .fetch_one(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check login id"))?;

    if exists > 0 {
        login_id_cache::mark_taken(login_id).await;
        return Ok(false);
    }

    Ok(true)
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/admin/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Missing name, login id or password", body = Object, example = json!({
            "message": "Name, login id and password are required"
        })),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Login id already registered", body = Object, example = json!({
            "message": "Login id already registered"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let name = payload.name.trim();
    let login_id = payload.login_id.trim();
    if name.is_empty() || login_id.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Name, login id and password are required".into(),
        ));
    }
    let role = Role::parse_or_default(payload.role.as_deref());

    if !is_login_id_available(login_id, pool.get_ref()).await? {
        return Err(ApiError::Conflict("Login id already registered"));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees (name, login_id, password_hash, role)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(login_id)
    .bind(&password_hash)
    .bind(role.as_ref())
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            // Unique key on login_id: lost a race with another create.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Err(ApiError::Conflict("Login id already registered"));
                }
            }
            error!(error = %e, "Failed to create employee");
            return Err(ApiError::Internal);
        }
    };

    login_id_filter::insert(login_id);
    login_id_cache::mark_taken(login_id).await;

    let employee = Employee {
        id: result.last_insert_id(),
        name: name.to_string(),
        login_id: login_id.to_string(),
        role,
        has_face: false,
    };
    info!(admin_id = auth.employee_id, employee_id = employee.id, "Employee created");

    Ok(HttpResponse::Created().json(employee))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/admin/employees",
    responses(
        (status = 200, description = "Employees ordered by name", body = [Employee]),
        (status = 403, description = "Admin only")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let employees = load_employees(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(employees))
}

pub async fn load_employees(pool: &MySqlPool) -> Result<Vec<Employee>, ApiError> {
    let rows = sqlx::query_as::<_, EmployeeRow>(
        r#"
        SELECT id, name, login_id, password_hash, role, face_descriptor
        FROM employees
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch employees"))?;

    Ok(rows.into_iter().map(Employee::from).collect())
}

/// Enroll a face descriptor for kiosk punching
#[utoipa::path(
    put,
    path = "/api/admin/employees/{employee_id}/face",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    request_body = SaveFace,
    responses(
        (status = 200, description = "Descriptor saved", body = Object, example = json!({
            "message": "Face descriptor saved"
        })),
        (status = 400, description = "Malformed descriptor"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn save_face(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<SaveFace>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    validate_descriptor(&payload.descriptor).map_err(ApiError::BadRequest)?;

    let result = sqlx::query("UPDATE employees SET face_descriptor = ? WHERE id = ?")
        .bind(Json(&payload.descriptor))
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save face descriptor"))?;

    if result.rows_affected() == 0 {
        // Re-enrolling an identical descriptor also affects 0 rows.
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
            .bind(employee_id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to look up employee"))?;
        if exists == 0 {
            return Err(ApiError::NotFound("Employee not found"));
        }
    }

    info!(admin_id = auth.employee_id, employee_id, "Face descriptor saved");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Face descriptor saved"
    })))
}
