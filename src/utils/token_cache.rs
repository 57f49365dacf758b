use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// face token -> employee id, keyed per organization. The directory is
/// read-mostly, so resolved tokens are kept hot to skip a DB round-trip on
/// every kiosk verification.
pub static TOKEN_CACHE: Lazy<Cache<String, u64>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(200_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

#[inline]
fn key(organization_id: u64, face_token: &str) -> String {
    format!("{}:{}", organization_id, face_token)
}

/// Remember a resolved token after a successful directory lookup.
pub async fn remember(organization_id: u64, face_token: &str, employee_id: u64) {
    TOKEN_CACHE.insert(key(organization_id, face_token), employee_id).await;
}

pub async fn lookup(organization_id: u64, face_token: &str) -> Option<u64> {
    TOKEN_CACHE.get(&key(organization_id, face_token)).await
}

/// Drop a token, e.g. after an employee is removed from the directory.
pub async fn forget(organization_id: u64, face_token: &str) {
    TOKEN_CACHE.invalidate(&key(organization_id, face_token)).await;
}

async fn batch_remember(rows: &[(u64, String, u64)]) {
    let futures: Vec<_> = rows
        .iter()
        .map(|(org, token, emp)| TOKEN_CACHE.insert(key(*org, token), *emp))
        .collect();

    futures::future::join_all(futures).await;
}

/// Preload active employees' tokens into the cache (batched).
pub async fn warmup_token_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (u64, String, u64)>(
        r#"
        SELECT organization_id, face_token, id
        FROM employees
        WHERE status = 'active'
        "#,
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(row?);
        total += 1;

        if batch.len() >= batch_size {
            batch_remember(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_remember(&batch).await;
    }

    log::info!("Face token cache warmup complete: {} employees", total);

    Ok(())
}
