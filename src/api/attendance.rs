use crate::auth::auth::AuthUser;
use crate::model::attendance_record::AttendanceRecord;
use crate::model::geofence::{FenceStatus, Geofence};
use crate::utils::db_utils::{db_error_response, is_unique_violation};
use crate::utils::geo;
use actix_web::{web, HttpResponse, Responder};
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CheckInReq {
    #[schema(example = "a1b2c3d4")]
    pub fence_code: String,
    #[schema(example = 6.5244)]
    pub latitude: f64,
    #[schema(example = 3.3792)]
    pub longitude: f64,
}

/// Why a check-in was refused. Gates run in a fixed order: fence status,
/// then duplicate, then coordinates and containment; the first failing gate
/// names the rejection.
#[derive(Debug, PartialEq, derive_more::Display)]
pub enum CheckInReject {
    #[display(fmt = "Geofence is not open for attendance (status: {})", _0)]
    NotOpen(FenceStatus),
    #[display(fmt = "Attendance already recorded for this geofence")]
    AlreadyRecorded,
    #[display(fmt = "Invalid coordinates")]
    InvalidCoordinates,
    #[display(fmt = "You are outside this geofence. Move closer and try again.")]
    OutsideGeofence,
}

/// Admission gates over already-fetched state; pure so the ordering is
/// testable without a database.
fn evaluate_gates(
    fence: &Geofence,
    already_recorded: bool,
    lat: f64,
    lon: f64,
    now: NaiveDateTime,
) -> Result<(), CheckInReject> {
    let status = fence.derived_status(now);
    if status != FenceStatus::Active {
        return Err(CheckInReject::NotOpen(status));
    }

    if already_recorded {
        return Err(CheckInReject::AlreadyRecorded);
    }

    match geo::is_within_circle(fence.latitude, fence.longitude, fence.radius, lat, lon) {
        Err(_) => Err(CheckInReject::InvalidCoordinates),
        Ok(false) => Err(CheckInReject::OutsideGeofence),
        Ok(true) => Ok(()),
    }
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    request_body = CheckInReq,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "geofence": "CSC101"
        })),
        (status = 400, description = "Fence not open, already recorded, outside the fence or bad coordinates", body = Object, example = json!({
            "message": "You are outside this geofence. Move closer and try again."
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown fence code"),
        (status = 503, description = "Storage unavailable, retry"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CheckInReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_student()?;

    let code = payload.fence_code.trim().to_lowercase();

    // fence lookup comes first: an unknown code is 404, everything later 400
    let fence = match sqlx::query_as::<_, Geofence>(
        r#"
        SELECT id, fence_code, name, creator_matric, latitude, longitude, radius,
               fence_type, start_time, end_time, status, time_created
        FROM geofences
        WHERE fence_code = ?
        "#,
    )
    .bind(&code)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(f)) => f,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Geofence not found. Confirm the code and try again."
            })))
        }
        Err(e) => return Ok(db_error_response(e, "fetch geofence by code")),
    };

    let already_recorded = match sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM attendance_records WHERE user_matric = ? AND fence_code = ? LIMIT 1)",
    )
    .bind(&auth.user_matric)
    .bind(&code)
    .fetch_one(pool.get_ref())
    .await
    {
        Ok(v) => v,
        Err(e) => return Ok(db_error_response(e, "check existing attendance")),
    };

    if let Err(reject) = evaluate_gates(
        &fence,
        already_recorded,
        payload.latitude,
        payload.longitude,
        Utc::now().naive_utc(),
    ) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": reject.to_string() })));
    }

    // persist; the unique (user_matric, fence_code) key settles concurrent
    // duplicates that slipped past the read above
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_records (user_matric, fence_code, geofence_name, timestamp)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&auth.user_matric)
    .bind(&fence.fence_code)
    .bind(&fence.name)
    .bind(Utc::now().naive_utc())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "message": "Checked in successfully",
            "geofence": fence.name
        }))),

        Err(e) => {
            // lost the race on the admission key
            if is_unique_violation(&e) {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": CheckInReject::AlreadyRecorded.to_string()
                })));
            }

            Ok(db_error_response(e, "insert attendance record"))
        }
    }
}

/// Attendance history for the calling student
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    responses(
        (status = 200, description = "Check-ins for the calling student, newest first", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 503, description = "Storage unavailable, retry"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_student()?;

    let records = match sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, user_matric, fence_code, geofence_name, timestamp
        FROM attendance_records
        WHERE user_matric = ?
        ORDER BY timestamp DESC
        "#,
    )
    .bind(&auth.user_matric)
    .fetch_all(pool.get_ref())
    .await
    {
        Ok(rows) => rows,
        Err(e) => return Ok(db_error_response(e, "fetch attendance history")),
    };

    Ok(HttpResponse::Ok().json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 5)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn open_fence() -> Geofence {
        Geofence {
            id: 1,
            fence_code: "a1b2c3d4".into(),
            name: "CSC101".into(),
            creator_matric: "STF/01/0001".into(),
            latitude: 6.5244,
            longitude: 3.3792,
            radius: 100.0,
            fence_type: "lecture".into(),
            start_time: dt(9),
            end_time: dt(11),
            status: "active".into(),
            time_created: dt(9),
        }
    }

    #[test]
    fn admits_inside_open_fence() {
        let f = open_fence();
        assert_eq!(evaluate_gates(&f, false, 6.5244, 3.3792, dt(10)), Ok(()));
    }

    #[test]
    fn expired_fence_rejects_before_duplicate_gate() {
        let f = open_fence();
        // both conditions hold; the status gate must name the rejection
        assert_eq!(
            evaluate_gates(&f, true, 6.5244, 3.3792, dt(12)),
            Err(CheckInReject::NotOpen(FenceStatus::Inactive))
        );
    }

    #[test]
    fn scheduled_fence_is_not_open() {
        let f = open_fence();
        assert_eq!(
            evaluate_gates(&f, false, 6.5244, 3.3792, dt(8)),
            Err(CheckInReject::NotOpen(FenceStatus::Scheduled))
        );
    }

    #[test]
    fn duplicate_rejects_before_containment_gate() {
        let f = open_fence();
        // the point is kilometers away; the duplicate gate still wins
        assert_eq!(
            evaluate_gates(&f, true, 6.6, 3.5, dt(10)),
            Err(CheckInReject::AlreadyRecorded)
        );
    }

    #[test]
    fn outside_point_is_rejected() {
        let f = open_fence();
        // roughly 500 m north of center, radius 100 m
        assert_eq!(
            evaluate_gates(&f, false, 6.5289, 3.3792, dt(10)),
            Err(CheckInReject::OutsideGeofence)
        );
    }

    #[test]
    fn malformed_coordinates_are_rejected_as_invalid() {
        let f = open_fence();
        assert_eq!(
            evaluate_gates(&f, false, 91.0, 3.3792, dt(10)),
            Err(CheckInReject::InvalidCoordinates)
        );
    }

    #[test]
    fn manually_deactivated_fence_is_closed_mid_window() {
        let mut f = open_fence();
        f.status = "inactive".into();
        assert_eq!(
            evaluate_gates(&f, false, 6.5244, 3.3792, dt(10)),
            Err(CheckInReject::NotOpen(FenceStatus::Inactive))
        );
    }

    #[test]
    fn boundary_of_window_and_circle_admits() {
        let f = open_fence();
        assert_eq!(evaluate_gates(&f, false, 6.5244, 3.3792, dt(11)), Ok(()));
    }

    #[test]
    fn check_in_request_parses() {
        let req: CheckInReq = serde_json::from_str(
            r#"{"fence_code": "A1B2C3D4", "latitude": 6.5244, "longitude": 3.3792}"#,
        )
        .unwrap();
        assert_eq!(req.fence_code, "A1B2C3D4");
        assert_eq!(req.latitude, 6.5244);
        assert_eq!(req.longitude, 3.3792);
    }

    #[test]
    fn rejection_messages_read_as_sentences() {
        assert_eq!(
            CheckInReject::NotOpen(FenceStatus::Scheduled).to_string(),
            "Geofence is not open for attendance (status: scheduled)"
        );
        assert_eq!(
            CheckInReject::AlreadyRecorded.to_string(),
            "Attendance already recorded for this geofence"
        );
    }
}
