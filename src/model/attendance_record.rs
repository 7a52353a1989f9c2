use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One admitted check-in. Immutable once written; the storage layer keeps
/// (user_matric, fence_code) unique so a student holds at most one row per
/// fence no matter how many requests race.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    #[schema(example = "UG/20/1234")]
    pub user_matric: String,
    #[schema(example = "a1b2c3d4")]
    pub fence_code: String,
    #[schema(example = "CSC101")]
    pub geofence_name: String,
    /// UTC admission time.
    #[schema(example = "2026-03-05T09:15:00", value_type = String, format = "date-time")]
    pub timestamp: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn serializes_with_flat_field_names() {
        let record = AttendanceRecord {
            id: 1,
            user_matric: "UG/20/1234".into(),
            fence_code: "a1b2c3d4".into(),
            geofence_name: "CSC101".into(),
            timestamp: NaiveDate::from_ymd_opt(2026, 3, 5)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["user_matric"], "UG/20/1234");
        assert_eq!(json["fence_code"], "a1b2c3d4");
        assert_eq!(json["timestamp"], "2026-03-05T09:15:00");
    }
}
