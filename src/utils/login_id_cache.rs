use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// Login ids known to be taken. Only positives are stored.
pub static LOGIN_ID_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

pub fn normalize(login_id: &str) -> String {
    login_id.trim().to_lowercase()
}

pub async fn mark_taken(login_id: &str) {
    LOGIN_ID_CACHE.insert(normalize(login_id), true).await;
}

pub async fn is_taken(login_id: &str) -> bool {
    LOGIN_ID_CACHE
        .get(&normalize(login_id))
        .await
        .unwrap_or(false)
}

async fn batch_mark(login_ids: &[String]) {
    let futures: Vec<_> = login_ids
        .iter()
        .map(|id| LOGIN_ID_CACHE.insert(normalize(id), true))
        .collect();

    futures::future::join_all(futures).await;
}

/// Loads the login ids of employees who signed in during the last `days` days.
pub async fn warmup_login_id_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT login_id
        FROM employees
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (login_id,) = row?;
        batch.push(login_id);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!(
        "Login id cache warmup complete: {} recent employees (last {} days)",
        total_count,
        days
    );

    Ok(())
}
