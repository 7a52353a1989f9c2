use crate::auth::auth::AuthUser;
use crate::model::role::Role;
use crate::model::user::User;
use crate::utils::db_utils::db_error_response;
use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Matric number to look up
    #[param(example = "UG/20/1234")]
    pub user_matric: String,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct UserAttendanceRow {
    #[schema(example = "CSC101")]
    pub geofence_name: String,
    #[schema(example = "2026-03-05T09:15:00", value_type = String, format = "date-time")]
    pub timestamp: NaiveDateTime,
}

#[derive(Serialize, ToSchema)]
pub struct UserRecordResponse {
    #[schema(example = "UG/20/1234")]
    pub user_matric: String,
    #[schema(example = "ada")]
    pub username: String,
    #[schema(example = "student")]
    pub role: String,
    pub attendances: Vec<UserAttendanceRow>,
}

/// Look up a user and their check-in history
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "User profile with attendance history", body = UserRecordResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 503, description = "Storage unavailable, retry"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user = match sqlx::query_as::<_, User>(
        r#"
        SELECT id, user_matric, username, password, role_id, is_active, last_login_at
        FROM users
        WHERE user_matric = ?
        "#,
    )
    .bind(query.user_matric.trim())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "User not found"
            })))
        }
        Err(e) => return Ok(db_error_response(e, "fetch user")),
    };

    let attendances = match sqlx::query_as::<_, UserAttendanceRow>(
        r#"
        SELECT geofence_name, timestamp
        FROM attendance_records
        WHERE user_matric = ?
        ORDER BY timestamp DESC
        "#,
    )
    .bind(&user.user_matric)
    .fetch_all(pool.get_ref())
    .await
    {
        Ok(rows) => rows,
        Err(e) => return Ok(db_error_response(e, "fetch user attendance")),
    };

    let role = Role::from_id(user.role_id)
        .map(|r| r.as_str())
        .unwrap_or("unknown");

    Ok(HttpResponse::Ok().json(UserRecordResponse {
        user_matric: user.user_matric,
        username: user.username,
        role: role.to_string(),
        attendances,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes_without_password_fields() {
        let resp = UserRecordResponse {
            user_matric: "UG/20/1234".into(),
            username: "ada".into(),
            role: "student".into(),
            attendances: vec![],
        };

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["role"], "student");
        assert!(json.get("password").is_none());
        assert!(json["attendances"].as_array().unwrap().is_empty());
    }
}
