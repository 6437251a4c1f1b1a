use chrono::Utc;
use clipfeed_dialect::{with_tx, DialectHandle};
use clipfeed_models::{Id, Job, Source};

use crate::create::insert_source_and_job;
use crate::validate::validate_url;
use crate::Error;

/// URL ingestion (§4.5): a 2-row transactional write. Validation happens
/// before the transaction starts, so an invalid URL never opens one.
pub async fn submit_url(handle: &DialectHandle, submitted_by: Id, url: &str) -> Result<(Source, Job), Error> {
    let (normalized_url, platform) = validate_url(url)?;

    with_tx(handle, |conn| async move {
        let now = Utc::now();
        insert_source_and_job(conn, handle.dialect(), submitted_by, normalized_url, platform, now).await
    })
    .await
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_dialect::Dialect;
    use clipfeed_models::{JobStatus, SourceStatus};

    async fn fresh_handle() -> (DialectHandle, Id) {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();
        let user = Id::new();
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?,'a','a@example.com','h')")
            .bind(user.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        (handle, user)
    }

    #[tokio::test]
    async fn writes_source_and_job_together() {
        let (handle, user) = fresh_handle().await;

        let (source, job) = submit_url(&handle, user, "https://www.youtube.com/watch?v=abc")
            .await
            .unwrap();

        assert_eq!(source.status, SourceStatus::Pending);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.source_id, source.id);

        let source_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        let job_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(source_count, 1);
        assert_eq!(job_count, 1);
    }

    #[tokio::test]
    async fn rejects_invalid_url_before_opening_a_transaction() {
        let (handle, user) = fresh_handle().await;

        let err = submit_url(&handle, user, "not-a-url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));

        let source_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(source_count, 0);
    }
}
