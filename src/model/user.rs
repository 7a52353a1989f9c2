use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    /// Matric number, the identity every engine decision keys on.
    pub user_matric: String,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub is_active: bool,
    pub last_login_at: Option<NaiveDateTime>,
}
