use clipfeed_dialect::DialectHandle;

use crate::evict::evict_under_pressure;
use crate::expire::expire_clips;
use crate::object_store::ObjectStore;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SweepCounts {
    pub expired: u64,
    pub evicted: u64,
    pub jobs_purged: u64,
}

/// Runs one full lifecycle sweep (§4.11): expire, evict under pressure,
/// then garbage-collect old terminal jobs via [`clipfeed_queue::purge`].
/// Each step is independent; a failure in one does not prevent the next
/// from running on the next invocation.
pub async fn sweep_once(
    handle: &DialectHandle,
    storage_limit_bytes: i64,
    store: &dyn ObjectStore,
) -> Result<SweepCounts, Error> {
    let expired = expire_clips(handle, store).await?;
    let evicted = evict_under_pressure(handle, storage_limit_bytes, store).await?;
    let jobs_purged = clipfeed_queue::purge(handle).await?;

    Ok(SweepCounts { expired, evicted, jobs_purged })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::object_store::RecordingStore;
    use clipfeed_dialect::Dialect;
    use clipfeed_models::Id;

    #[tokio::test]
    async fn sweep_once_runs_all_three_steps_without_error() {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();

        let id = Id::new();
        sqlx::query(
            "INSERT INTO clips (id, title, duration_seconds, start_time, end_time, storage_key, expires_at, status) \
             VALUES (?, 't', 10.0, 0.0, 10.0, 'k', '2000-01-01T00:00:00.000Z', 'ready')",
        )
        .bind(id.to_string())
        .execute(handle.pool())
        .await
        .unwrap();

        let store = RecordingStore::new();
        let counts = sweep_once(&handle, 1_000_000_000, &store).await.unwrap();
        assert_eq!(counts.expired, 1);
        assert_eq!(counts.evicted, 0);
    }
}
