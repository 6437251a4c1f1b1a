use clipfeed_dialect::{with_tx, DialectHandle};
use clipfeed_models::ReclaimCounts;
use sqlx::Row;

use crate::util::append_error;
use crate::Error;

/// Reclaims `running` jobs whose `started_at` is older than `cutoff_minutes`
/// (default 120, §4.4). A job with attempts left is requeued; one that has
/// exhausted `max_attempts` is failed outright. Safe to call repeatedly and
/// concurrently — each call only ever touches rows it still finds
/// `running` inside its own transaction.
pub async fn reclaim_stale(
    handle: &DialectHandle,
    cutoff_minutes: i64,
) -> Result<ReclaimCounts, Error> {
    with_tx(handle, |conn| async move {
        let dialect = handle.dialect();
        let cutoff_expr = dialect.datetime_modifier_expr(&format!("-{cutoff_minutes} minutes"));

        let select_sql = dialect.rewrite(&format!(
            "SELECT id, attempts, max_attempts, error FROM jobs \
             WHERE status = 'running' AND started_at <= {cutoff_expr}",
        ));
        let rows = sqlx::query(&select_sql).fetch_all(&mut *conn).await?;

        let message = format!("stale watchdog: recovered running job older than {cutoff_minutes}m");
        let mut counts = ReclaimCounts::default();

        for row in rows {
            let id: String = row.try_get("id")?;
            let attempts: i32 = row.try_get("attempts")?;
            let max_attempts: i32 = row.try_get("max_attempts")?;
            let existing_error: Option<String> = row.try_get("error")?;
            let appended = append_error(existing_error.as_deref(), &message);

            if attempts < max_attempts {
                let sql = dialect.rewrite(
                    "UPDATE jobs SET status = 'queued', run_after = NULL, error = ? WHERE id = ?",
                );
                sqlx::query(&sql)
                    .bind(&appended)
                    .bind(&id)
                    .execute(&mut *conn)
                    .await?;
                counts.requeued += 1;
            } else {
                let sql = dialect.rewrite(&format!(
                    "UPDATE jobs SET status = 'failed', completed_at = {now}, error = ? WHERE id = ?",
                    now = dialect.now_utc_expr(),
                ));
                sqlx::query(&sql)
                    .bind(&appended)
                    .bind(&id)
                    .execute(&mut *conn)
                    .await?;
                counts.failed += 1;
            }
        }

        Ok(counts)
    })
    .await
}

#[cfg(test)]
mod test {
    use super::*;
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

        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES ('u1','a','a@example.com','h')")
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO sources (id, url, platform, submitted_by) VALUES ('s1','https://x','direct','u1')")
            .execute(handle.pool())
            .await
            .unwrap();
        handle
    }

    #[tokio::test]
    async fn requeues_jobs_with_attempts_remaining() {
        let handle = seeded_handle().await;
        sqlx::query(
            "INSERT INTO jobs (id, source_id, job_type, status, attempts, max_attempts, started_at) \
             VALUES ('j1', 's1', 'download', 'running', 1, 3, '2000-01-01T00:00:00.000Z')",
        )
        .execute(handle.pool())
        .await
        .unwrap();

        let counts = reclaim_stale(&handle, 120).await.unwrap();
        assert_eq!(counts.requeued, 1);
        assert_eq!(counts.failed, 0);

        let (status, error): (String, Option<String>) =
            sqlx::query_as("SELECT status, error FROM jobs WHERE id = 'j1'")
                .fetch_one(handle.pool())
                .await
                .unwrap();
        assert_eq!(status, "queued");
        assert!(error.unwrap().contains("stale watchdog"));
    }

    #[tokio::test]
    async fn fails_jobs_with_no_attempts_remaining() {
        let handle = seeded_handle().await;
        sqlx::query(
            "INSERT INTO jobs (id, source_id, job_type, status, attempts, max_attempts, started_at, error) \
             VALUES ('j1', 's1', 'download', 'running', 3, 3, '2000-01-01T00:00:00.000Z', 'prior failure')",
        )
        .execute(handle.pool())
        .await
        .unwrap();

        let counts = reclaim_stale(&handle, 120).await.unwrap();
        assert_eq!(counts.requeued, 0);
        assert_eq!(counts.failed, 1);

        let (status, error): (String, Option<String>) =
            sqlx::query_as("SELECT status, error FROM jobs WHERE id = 'j1'")
                .fetch_one(handle.pool())
                .await
                .unwrap();
        assert_eq!(status, "failed");
        assert_eq!(error.unwrap(), "prior failure|stale watchdog: recovered running job older than 120m");
    }

    #[tokio::test]
    async fn leaves_recently_started_jobs_alone() {
        let handle = seeded_handle().await;
        let recent = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO jobs (id, source_id, job_type, status, attempts, max_attempts, started_at) \
             VALUES ('j1', 's1', 'download', 'running', 1, 3, ?)",
        )
        .bind(recent)
        .execute(handle.pool())
        .await
        .unwrap();

        let counts = reclaim_stale(&handle, 120).await.unwrap();
        assert_eq!(counts.requeued, 0);
        assert_eq!(counts.failed, 0);
    }
}
