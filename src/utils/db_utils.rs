use actix_web::HttpResponse;
use serde_json::json;

/// MySQL reports every duplicate-key violation as SQLSTATE 23000.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

/// True when `err` is a duplicate-key violation on the named unique key.
/// The driver message carries the key name, e.g.
/// `Duplicate entry 'x' for key 'geofences.uk_geofences_code'`.
pub fn violates_key(err: &sqlx::Error, key: &str) -> bool {
    if !is_unique_violation(err) {
        return false;
    }
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains(key),
        _ => false,
    }
}

/// Transient failures where nothing was committed; the caller may retry
/// the whole operation.
pub fn is_retryable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
    )
}

/// Map a storage error to the caller-facing response: 503 for transient
/// failures, 500 (logged) for anything unexpected.
pub fn db_error_response(err: sqlx::Error, context: &str) -> HttpResponse {
    if is_retryable(&err) {
        return HttpResponse::ServiceUnavailable().json(json!({
            "message": "Storage temporarily unavailable. Please retry."
        }));
    }
    tracing::error!(error = %err, context, "Unexpected database error");
    HttpResponse::InternalServerError().json(json!({
        "message": "Internal Server Error"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct FakeDbError {
        code: &'static str,
        message: &'static str,
    }

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl std::error::Error for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    fn duplicate_key_error(message: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError {
            code: "23000",
            message,
        }))
    }

    #[test]
    fn recognizes_unique_violations() {
        let err = duplicate_key_error(
            "Duplicate entry 'UG/20/1234-a1b2c3d4' for key 'attendance_records.uk_attendance_user_fence'",
        );
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn names_the_violated_key() {
        let err =
            duplicate_key_error("Duplicate entry 'abc123' for key 'geofences.uk_geofences_code'");
        assert!(violates_key(&err, "uk_geofences_code"));
        assert!(!violates_key(&err, "uk_geofences_name_day"));
    }

    #[test]
    fn other_sqlstates_are_not_duplicates() {
        let err = sqlx::Error::Database(Box::new(FakeDbError {
            code: "42S02",
            message: "Table 'geoattend.missing' doesn't exist",
        }));
        assert!(!is_unique_violation(&err));
        assert!(!violates_key(&err, "uk_geofences_code"));
    }

    #[test]
    fn pool_exhaustion_is_retryable() {
        assert!(is_retryable(&sqlx::Error::PoolTimedOut));
        assert!(is_retryable(&sqlx::Error::PoolClosed));
        assert!(!is_retryable(&sqlx::Error::RowNotFound));
    }
}
