use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// true  => matric number is TAKEN
/// false => matric number is AVAILABLE (usually we store only taken)
pub static MATRIC_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000) // tune based on memory
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single matric number as taken
pub async fn mark_taken(matric: &str) {
    MATRIC_CACHE.insert(matric.to_lowercase(), true).await;
}

/// Check if a matric number is taken
pub async fn is_taken(matric: &str) -> bool {
    MATRIC_CACHE
        .get(&matric.to_lowercase())
        .await
        .unwrap_or(false)
}

/// Batch mark matric numbers as taken
async fn batch_mark(matrics: &[String]) {
    let futures: Vec<_> = matrics
        .iter()
        .map(|m| MATRIC_CACHE.insert(m.to_lowercase(), true))
        .collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
}

/// Load only RECENTLY active matric numbers into the in-memory cache (batched)
pub async fn warmup_matric_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT user_matric
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (matric,) = row?;
        batch.push(matric);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    // Insert any remaining matric numbers
    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!(
        "Matric cache warmup complete: {} recent users (last {} days)",
        total_count,
        days
    );

    Ok(())
}
