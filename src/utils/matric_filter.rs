use anyhow::{anyhow, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real enrollment counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static MATRIC_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(
        FILTER_CAPACITY,
        FALSE_POSITIVE_RATE,
    ))
});

#[inline]
fn normalize(matric: &str) -> String {
    matric.to_lowercase()
}

/// Check if a matric number might be registered (false positives possible)
pub fn might_exist(matric: &str) -> bool {
    let matric = normalize(matric);
    MATRIC_FILTER
        .read()
        .expect("matric filter poisoned")
        .contains(&matric)
}

/// Insert a single matric number into the filter
pub fn insert(matric: &str) {
    let matric = normalize(matric);
    MATRIC_FILTER
        .write()
        .expect("matric filter poisoned")
        .add(&matric);
}

/// Warm up the matric filter using streaming + batching
pub async fn warmup_matric_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, (String,)>("SELECT user_matric FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (matric,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&matric));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Matric filter warmup complete: {} users", total);
    Ok(())
}

/// Insert a batch of normalized matric numbers
fn insert_batch(matrics: &[String]) {
    let mut filter = MATRIC_FILTER.write().expect("matric filter poisoned");

    for matric in matrics {
        filter.add(matric);
    }
}
