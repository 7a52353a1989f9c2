use crate::api::attendance::CheckInReq;
use crate::api::geofence::{
    AttendanceReportQuery, AttendanceReportRow, DeactivateReq, GeofenceCreate, GeofenceCreated,
    GeofenceListQuery, GeofenceListResponse, GeofenceSummary,
};
use crate::api::user::{UserAttendanceRow, UserQuery, UserRecordResponse};
use crate::model::attendance_record::AttendanceRecord;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::Modify;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geoattend API",
        version = "1.0.0",
        description = r#"
## Location-verified attendance

This API powers a **geofenced attendance** service: lecturers open a circular,
time-bounded geofence for a class or event, and students check in with the
fence code and their current coordinates.

### Key Features
- **Geofence Management**
  - Create fences with a civil-time window, list them, deactivate your own
- **Attendance Check-in**
  - Admits a student only while the fence is active, only inside the circle, at most once per fence
- **Reporting**
  - Per-student history and creator-only per-fence attendance sheets

### Security
All engine endpoints are protected using **JWT Bearer authentication**.
Fence creation, deactivation and reports are **Admin** operations;
check-in and history are **Student** operations.

### Response Format
- JSON-based RESTful responses
- Pagination supported for the fence directory

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::geofence::create_geofence,
        crate::api::geofence::list_geofences,
        crate::api::geofence::deactivate_geofence,
        crate::api::geofence::get_attendance,

        crate::api::attendance::check_in,
        crate::api::attendance::my_attendance,

        crate::api::user::get_user
    ),
    components(
        schemas(
            GeofenceCreate,
            GeofenceCreated,
            GeofenceSummary,
            GeofenceListResponse,
            GeofenceListQuery,
            DeactivateReq,
            AttendanceReportQuery,
            AttendanceReportRow,
            CheckInReq,
            AttendanceRecord,
            UserQuery,
            UserAttendanceRow,
            UserRecordResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Geofence", description = "Geofence lifecycle APIs"),
        (name = "Attendance", description = "Check-in and history APIs"),
        (name = "User", description = "User lookup APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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
