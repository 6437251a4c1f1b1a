use clipfeed_dialect::DialectHandle;
use clipfeed_models::Id;
use sqlx::Row;

use crate::object_store::ObjectStore;
use crate::Error;

/// Evicts the oldest unprotected ready clips until total storage is back
/// under `limit_bytes` (§4.11 step 2). Returns the number of clips
/// evicted.
pub async fn evict_under_pressure(
    handle: &DialectHandle,
    limit_bytes: i64,
    store: &dyn ObjectStore,
) -> Result<u64, Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(file_size_bytes), 0) FROM clips WHERE status = 'ready'",
    )
    .fetch_one(handle.pool())
    .await?;

    if total <= limit_bytes {
        return Ok(0);
    }

    let sql = handle.dialect().rewrite(
        "SELECT id, storage_key, file_size_bytes FROM clips \
         WHERE is_protected = 0 AND status = 'ready' \
         ORDER BY created_at ASC",
    );
    let rows = sqlx::query(&sql).fetch_all(handle.pool()).await?;

    let mut remaining = total;
    let mut evicted = 0u64;

    for row in rows {
        if remaining <= limit_bytes {
            break;
        }

        let id: String = row.try_get("id")?;
        let storage_key: String = row.try_get("storage_key")?;
        let file_size_bytes: i64 = row.try_get("file_size_bytes")?;
        let id = id.parse::<Id>().map_err(|err| Error::MalformedRow(format!("invalid clip id {id:?}: {err}")))?;

        if let Err(err) = store.delete(&storage_key).await {
            tracing::error!(clip_id = %id, error = %err, "failed to delete evicted clip from object storage; leaving it ready for the next sweep");
            continue;
        }

        let sql = handle.dialect().rewrite("UPDATE clips SET status = 'evicted' WHERE id = ?");
        sqlx::query(&sql).bind(id.to_string()).execute(handle.pool()).await?;

        remaining -= file_size_bytes;
        evicted += 1;
    }

    Ok(evicted)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::object_store::RecordingStore;
    use clipfeed_dialect::Dialect;

    async fn seeded_handle() -> DialectHandle {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();
        handle
    }

    async fn insert_clip(handle: &DialectHandle, id: Id, file_size_bytes: i64, is_protected: bool, created_at: &str) {
        sqlx::query(
            "INSERT INTO clips (id, title, duration_seconds, start_time, end_time, storage_key, file_size_bytes, is_protected, status, created_at) \
             VALUES (?, 't', 10.0, 0.0, 10.0, ?, ?, ?, 'ready', ?)",
        )
        .bind(id.to_string())
        .bind(format!("clips/{id}.mp4"))
        .bind(file_size_bytes)
        .bind(is_protected as i64)
        .bind(created_at)
        .execute(handle.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn does_nothing_when_under_the_limit() {
        let handle = seeded_handle().await;
        insert_clip(&handle, Id::new(), 1000, false, "2020-01-01T00:00:00.000Z").await;

        let store = RecordingStore::new();
        let evicted = evict_under_pressure(&handle, 10_000, &store).await.unwrap();
        assert_eq!(evicted, 0);
    }

    #[tokio::test]
    async fn evicts_oldest_first_until_under_the_limit() {
        let handle = seeded_handle().await;
        let oldest = Id::new();
        let newest = Id::new();
        insert_clip(&handle, oldest, 6_000, false, "2020-01-01T00:00:00.000Z").await;
        insert_clip(&handle, newest, 6_000, false, "2022-01-01T00:00:00.000Z").await;

        let store = RecordingStore::new();
        let evicted = evict_under_pressure(&handle, 10_000, &store).await.unwrap();
        assert_eq!(evicted, 1);

        let status: String = sqlx::query_scalar("SELECT status FROM clips WHERE id = ?")
            .bind(oldest.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(status, "evicted");

        let status: String = sqlx::query_scalar("SELECT status FROM clips WHERE id = ?")
            .bind(newest.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(status, "ready");
    }

    #[tokio::test]
    async fn never_evicts_a_protected_clip() {
        let handle = seeded_handle().await;
        let protected = Id::new();
        insert_clip(&handle, protected, 20_000, true, "2020-01-01T00:00:00.000Z").await;

        let store = RecordingStore::new();
        let evicted = evict_under_pressure(&handle, 10_000, &store).await.unwrap();
        assert_eq!(evicted, 0);
    }
}
