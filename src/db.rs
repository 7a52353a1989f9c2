use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;

pub async fn init_db(database_url: &str) -> MySqlPool {
    // bounded acquire wait so a saturated pool surfaces as PoolTimedOut
    // instead of hanging request handlers
    MySqlPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .expect("Failed to connect to database")
}
