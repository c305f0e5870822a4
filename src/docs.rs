use crate::api::admin::{EditPunch, ManualPunch, Stats};
use crate::api::employee::{CreateEmployee, SaveFace};
use crate::api::kiosk::{KioskPunch, KioskPunchResponse};
use crate::api::punch::{AllowedResponse, CreatePunch};
use crate::auth::handlers::LoginResponse;
use crate::model::employee::{Employee, KioskEmployee};
use crate::model::punch::{Punch, PunchLog, PunchType};
use crate::model::role::Role;
use crate::models::LoginReqDto;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Time Clock API",
        version = "1.0.0",
        description = r#"
## Employee Time Clock

Employees punch sequential attendance events and administrators review them.

### Punch sequence
`check_in` → (`break_out` → `break_in`)? → `check_out`, at most four punches a day
and at least two minutes between punches. Manual punches and edits made by an
admin are not checked against the sequence.

### Security
`/api` endpoints require a **JWT Bearer** access token obtained from `/auth/login`.
Kiosk endpoints require the `X-Kiosk-Key` header.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::session,

        crate::api::punch::create_punch,
        crate::api::punch::list_punches,
        crate::api::punch::allowed_punches,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::save_face,

        crate::api::admin::manual_punch,
        crate::api::admin::edit_punch,
        crate::api::admin::delete_punch,
        crate::api::admin::stats,
        crate::api::admin::export_csv,

        crate::api::kiosk::kiosk_employees,
        crate::api::kiosk::kiosk_punch
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            Role,
            PunchType,
            Punch,
            PunchLog,
            CreatePunch,
            AllowedResponse,
            Employee,
            CreateEmployee,
            SaveFace,
            ManualPunch,
            EditPunch,
            Stats,
            KioskEmployee,
            KioskPunch,
            KioskPunchResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and session"),
        (name = "Punches", description = "Self-service punching and history"),
        (name = "Employee", description = "Employee management (admin)"),
        (name = "Admin", description = "Manual punches, stats and export (admin)"),
        (name = "Kiosk", description = "Shared kiosk devices"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
