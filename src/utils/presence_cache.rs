use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::core::schedule::HEARTBEAT_INTERVAL_SECS;

/// Users whose presence row was refreshed within the heartbeat interval.
/// An entry here means the next request can skip the database write.
static PRESENCE_CACHE: Lazy<Cache<u64, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(HEARTBEAT_INTERVAL_SECS))
        .build()
});

/// True when the user has no fresh heartbeat and the row should be touched.
pub async fn should_heartbeat(user_id: u64) -> bool {
    PRESENCE_CACHE.get(&user_id).await.is_none()
}

pub async fn mark_seen(user_id: u64) {
    PRESENCE_CACHE.insert(user_id, ()).await;
}

async fn batch_mark(user_ids: &[u64]) {
    let futures: Vec<_> = user_ids
        .iter()
        .map(|id| PRESENCE_CACHE.insert(*id, ()))
        .collect();

    futures::future::join_all(futures).await;
}

/// Seed the throttle with users already seen within the interval, so a
/// restart does not trigger a burst of redundant presence writes.
pub async fn warmup_presence_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (u64,)>(
        r#"
        SELECT user_id
        FROM user_daily_logins
        WHERE date = CURDATE()
          AND online = TRUE
          AND last_seen_at >= NOW() - INTERVAL ? SECOND
        "#,
    )
    .bind(HEARTBEAT_INTERVAL_SECS)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (user_id,) = row?;
        batch.push(user_id);
        total += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!("Presence cache warmup complete: {} recently seen users", total);

    Ok(())
}
