use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::geofence::{civil_to_utc, initial_status, FenceStatus, Geofence};
use crate::utils::db_utils::{db_error_response, violates_key};
use crate::utils::fence_code::generate_fence_code;
use crate::utils::geo;
use actix_web::{web, HttpResponse, Responder};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

/// Retries before giving up on allocating an unused fence code.
const CODE_ALLOC_ATTEMPTS: usize = 5;

#[derive(Deserialize, ToSchema)]
pub struct GeofenceCreate {
    #[schema(example = "CSC101")]
    pub name: String,
    #[schema(example = 6.5244)]
    pub latitude: f64,
    #[schema(example = 3.3792)]
    pub longitude: f64,
    /// meters
    #[schema(example = 100.0)]
    pub radius: f64,
    #[schema(example = "lecture")]
    pub fence_type: String,
    /// Organization-local civil time.
    #[schema(example = "2026-03-05T10:00:00", value_type = String, format = "date-time")]
    pub start_time: NaiveDateTime,
    #[schema(example = "2026-03-05T11:00:00", value_type = String, format = "date-time")]
    pub end_time: NaiveDateTime,
}

#[derive(Serialize, ToSchema)]
pub struct GeofenceCreated {
    #[schema(example = "a1b2c3d4")]
    pub code: String,
    #[schema(example = "CSC101")]
    pub name: String,
}

/// Broad listing row. Geometry is withheld: students learn whether they are
/// inside by attempting a check-in, not by reading the circle.
#[derive(Serialize, ToSchema)]
pub struct GeofenceSummary {
    pub fence_code: String,
    pub name: String,
    pub fence_type: String,
    #[schema(example = "active")]
    pub status: String,
    #[schema(example = "2026-03-05T09:00:00", value_type = String, format = "date-time")]
    pub start_time: NaiveDateTime,
    #[schema(example = "2026-03-05T10:00:00", value_type = String, format = "date-time")]
    pub end_time: NaiveDateTime,
}

#[derive(Serialize, ToSchema)]
pub struct GeofenceListResponse {
    pub data: Vec<GeofenceSummary>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct GeofenceListQuery {
    /// Pagination page number (starts at 1)
    pub page: Option<u64>,
    /// Items per page (max 100)
    pub per_page: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct DeactivateReq {
    #[schema(example = "CSC101")]
    pub name: String,
    /// Calendar date the fence window starts on (UTC).
    #[schema(example = "2026-03-05", value_type = String, format = "date")]
    pub date: NaiveDate,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceReportQuery {
    /// Fence name (course title)
    #[param(example = "CSC101")]
    pub course_title: String,
    /// Calendar date the fence window starts on (UTC).
    #[param(example = "2026-03-05", value_type = String)]
    #[schema(example = "2026-03-05", value_type = String)]
    pub date: NaiveDate,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceReportRow {
    #[schema(example = "ada")]
    pub username: String,
    #[schema(example = "UG/20/1234")]
    pub user_matric: String,
    #[schema(example = "2026-03-05T09:15:00", value_type = String, format = "date-time")]
    pub timestamp: NaiveDateTime,
}

fn summarize(fence: Geofence, now: NaiveDateTime) -> GeofenceSummary {
    let status = fence.derived_status(now).to_string();
    GeofenceSummary {
        fence_code: fence.fence_code,
        name: fence.name,
        fence_type: fence.fence_type,
        status,
        start_time: fence.start_time,
        end_time: fence.end_time,
    }
}

fn page_offset(page: u64, per_page: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(per_page)
}

/// Why a deactivation was refused. Creator gate first, then liveness.
#[derive(Debug, PartialEq, derive_more::Display)]
pub enum DeactivateReject {
    #[display(fmt = "Only the creator can deactivate this geofence")]
    NotCreator,
    #[display(fmt = "Geofence is already inactive")]
    AlreadyInactive,
}

/// Deactivation gates over an already-fetched fence; pure so the ordering is
/// testable without a database.
fn evaluate_deactivation(
    fence: &Geofence,
    requester_matric: &str,
    now: NaiveDateTime,
) -> Result<(), DeactivateReject> {
    if fence.creator_matric != requester_matric {
        return Err(DeactivateReject::NotCreator);
    }

    // expiry counts: an elapsed window reads inactive whatever the row says
    if fence.derived_status(now) == FenceStatus::Inactive {
        return Err(DeactivateReject::AlreadyInactive);
    }

    Ok(())
}

async fn find_fence_by_name_and_day(
    pool: &MySqlPool,
    name: &str,
    day: NaiveDate,
) -> Result<Option<Geofence>, sqlx::Error> {
    sqlx::query_as::<_, Geofence>(
        r#"
        SELECT id, fence_code, name, creator_matric, latitude, longitude, radius,
               fence_type, start_time, end_time, status, time_created
        FROM geofences
        WHERE name = ? AND start_day = ?
        "#,
    )
    .bind(name)
    .bind(day)
    .fetch_optional(pool)
    .await
}

/// Create a geofence
#[utoipa::path(
    post,
    path = "/api/v1/geofences",
    request_body = GeofenceCreate,
    responses(
        (status = 201, description = "Geofence created", body = GeofenceCreated),
        (status = 400, description = "Bad window or bad geometry", body = Object, example = json!({
            "message": "End time cannot be in the past."
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "A fence with this name already exists for that day"),
        (status = 503, description = "Storage unavailable, retry"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Geofence"
)]
pub async fn create_geofence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<GeofenceCreate>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Geofence name must not be empty"
        })));
    }

    if geo::validate_circle(payload.latitude, payload.longitude, payload.radius).is_err() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Invalid center coordinates or radius"
        })));
    }

    // normalize the submitted civil window to the stored UTC convention
    let zone = config.org_zone();
    let (start_utc, end_utc) = match (
        civil_to_utc(payload.start_time, zone),
        civil_to_utc(payload.end_time, zone),
    ) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Start or end time is out of range"
            })))
        }
    };
    let now = Utc::now().naive_utc();

    let status = match initial_status(start_utc, end_utc, now) {
        Ok(s) => s,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })))
        }
    };

    // one fence per name per day
    let day_taken = match sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM geofences WHERE name = ? AND start_day = ? LIMIT 1)",
    )
    .bind(&name)
    .bind(start_utc.date())
    .fetch_one(pool.get_ref())
    .await
    {
        Ok(v) => v,
        Err(e) => return Ok(db_error_response(e, "check fence name/day")),
    };

    if day_taken {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Geofence with this name already exists for today"
        })));
    }

    // allocate a code; regenerate on the (rare) collision
    for _ in 0..CODE_ALLOC_ATTEMPTS {
        let code = generate_fence_code();

        let result = sqlx::query(
            r#"
            INSERT INTO geofences
                (fence_code, name, creator_matric, latitude, longitude, radius,
                 fence_type, start_time, end_time, status, time_created)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&code)
        .bind(&name)
        .bind(&auth.user_matric)
        .bind(payload.latitude)
        .bind(payload.longitude)
        .bind(payload.radius)
        .bind(payload.fence_type.trim())
        .bind(start_utc)
        .bind(end_utc)
        .bind(status.to_string())
        .bind(now)
        .execute(pool.get_ref())
        .await;

        match result {
            Ok(_) => {
                info!(fence_code = %code, name = %name, "Geofence created");
                return Ok(HttpResponse::Created().json(GeofenceCreated { code, name }));
            }
            Err(e) if violates_key(&e, "uk_geofences_code") => {
                warn!(fence_code = %code, "Fence code collision, regenerating");
                continue;
            }
            Err(e) if violates_key(&e, "uk_geofences_name_day") => {
                // lost a concurrent-create race on (name, day)
                return Ok(HttpResponse::Conflict().json(json!({
                    "message": "Geofence with this name already exists for today"
                })));
            }
            Err(e) => return Ok(db_error_response(e, "insert geofence")),
        }
    }

    error!("Exhausted fence code allocation attempts");
    Ok(HttpResponse::InternalServerError().json(json!({
        "message": "Internal Server Error"
    })))
}

/// List geofences (paginated)
#[utoipa::path(
    get,
    path = "/api/v1/geofences",
    params(GeofenceListQuery),
    responses(
        (status = 200, description = "Paginated fence directory", body = GeofenceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Storage unavailable, retry"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Geofence"
)]
pub async fn list_geofences(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<GeofenceListQuery>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = page_offset(page, per_page);

    let total = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM geofences")
        .fetch_one(pool.get_ref())
        .await
    {
        Ok(v) => v,
        Err(e) => return Ok(db_error_response(e, "count geofences")),
    };

    let fences = match sqlx::query_as::<_, Geofence>(
        r#"
        SELECT id, fence_code, name, creator_matric, latitude, longitude, radius,
               fence_type, start_time, end_time, status, time_created
        FROM geofences
        ORDER BY start_time DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await
    {
        Ok(rows) => rows,
        Err(e) => return Ok(db_error_response(e, "list geofences")),
    };

    let now = Utc::now().naive_utc();
    let data = fences.into_iter().map(|f| summarize(f, now)).collect();

    Ok(HttpResponse::Ok().json(GeofenceListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Deactivate a geofence (creator only, terminal)
#[utoipa::path(
    put,
    path = "/api/v1/geofences/deactivate",
    request_body = DeactivateReq,
    responses(
        (status = 200, description = "Geofence deactivated", body = Object, example = json!({
            "message": "Geofence 'CSC101' deactivated"
        })),
        (status = 400, description = "Geofence is already inactive"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the creator"),
        (status = 404, description = "No fence with that name and date"),
        (status = 503, description = "Storage unavailable, retry"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Geofence"
)]
pub async fn deactivate_geofence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DeactivateReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let fence =
        match find_fence_by_name_and_day(pool.get_ref(), payload.name.trim(), payload.date).await {
            Ok(Some(f)) => f,
            Ok(None) => {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Geofence doesn't exist for specified name and date"
                })))
            }
            Err(e) => return Ok(db_error_response(e, "fetch geofence by name/day")),
        };

    if let Err(reject) = evaluate_deactivation(&fence, &auth.user_matric, Utc::now().naive_utc()) {
        let body = json!({ "message": reject.to_string() });
        return Ok(match reject {
            DeactivateReject::NotCreator => HttpResponse::Forbidden().json(body),
            DeactivateReject::AlreadyInactive => HttpResponse::BadRequest().json(body),
        });
    }

    // guarded update; a lost race lands in the same already-inactive answer
    let result = match sqlx::query(
        "UPDATE geofences SET status = 'inactive' WHERE id = ? AND status <> 'inactive'",
    )
    .bind(fence.id)
    .execute(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => return Ok(db_error_response(e, "deactivate geofence")),
    };

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": DeactivateReject::AlreadyInactive.to_string()
        })));
    }

    info!(fence_code = %fence.fence_code, "Geofence manually deactivated");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Geofence '{}' deactivated", fence.name)
    })))
}

/// Attendance sheet for one fence (creator only)
#[utoipa::path(
    get,
    path = "/api/v1/geofences/attendance",
    params(AttendanceReportQuery),
    responses(
        (status = 200, description = "Who checked in, in admission order", body = Object, example = json!({
            "course_title": "CSC101",
            "records": [{"username": "ada", "user_matric": "UG/20/1234", "timestamp": "2026-03-05T09:15:00"}]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the creator"),
        (status = 404, description = "Unknown fence, or no records yet"),
        (status = 503, description = "Storage unavailable, retry"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Geofence"
)]
pub async fn get_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let fence = match find_fence_by_name_and_day(
        pool.get_ref(),
        query.course_title.trim(),
        query.date,
    )
    .await
    {
        Ok(Some(f)) => f,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Geofence doesn't exist for specified course and date. No records"
            })))
        }
        Err(e) => return Ok(db_error_response(e, "fetch geofence by name/day")),
    };

    if fence.creator_matric != auth.user_matric {
        return Ok(HttpResponse::Forbidden().json(json!({
            "message": "Only the geofence creator can view these records"
        })));
    }

    // (name, date) resolves to exactly one fence; its sheet is the rows
    // bearing its code, so same-named fences on other days never bleed in
    let rows = match sqlx::query_as::<_, AttendanceReportRow>(
        r#"
        SELECT u.username, a.user_matric, a.timestamp
        FROM attendance_records a
        JOIN users u ON u.user_matric = a.user_matric
        WHERE a.fence_code = ?
        ORDER BY a.timestamp
        "#,
    )
    .bind(&fence.fence_code)
    .fetch_all(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => return Ok(db_error_response(e, "fetch attendance report")),
    };

    if rows.is_empty() {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "No attendance records yet"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "course_title": fence.name,
        "records": rows
    })))
}
