use chrono::Utc;
use clipfeed_dialect::{with_tx, DialectHandle};
use clipfeed_models::{Id, Job, Platform, Source};
use sqlx::Row;

use crate::create::{insert_source_and_job, parse_id};
use crate::validate::validate_url;
use crate::Error;

/// Approves a pending scout candidate, turning it into a source + download
/// job via the same insert path as direct submission (§4.9, C9). Only the
/// scout source's owner may approve, and only while the candidate is still
/// `pending`.
pub async fn approve_candidate(
    handle: &DialectHandle,
    candidate_id: Id,
    caller: Id,
) -> Result<(Source, Job), Error> {
    with_tx(handle, |conn| async move {
        let dialect = handle.dialect();

        let sql = dialect.rewrite(
            "SELECT c.url as url, c.status as status, s.owner_id as owner_id \
             FROM scout_candidates c \
             JOIN scout_sources s ON s.id = c.scout_source_id \
             WHERE c.id = ?",
        );
        let row = sqlx::query(&sql)
            .bind(candidate_id.to_string())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(Error::NotFound)?;

        let owner_id: String = row.try_get("owner_id")?;
        if parse_id(&owner_id)? != caller {
            return Err(Error::Forbidden);
        }

        let status: String = row.try_get("status")?;
        if status != "pending" {
            return Err(Error::NotPending);
        }

        let url: String = row.try_get("url")?;
        let (normalized_url, platform) = validate_url(&url)?;
        let now = Utc::now();

        let result = insert_source_and_job(conn, dialect, caller, normalized_url, platform, now).await?;

        let sql = dialect.rewrite("UPDATE scout_candidates SET status = 'ingested' WHERE id = ?");
        sqlx::query(&sql)
            .bind(candidate_id.to_string())
            .execute(&mut *conn)
            .await?;

        Ok(result)
    })
    .await
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_dialect::Dialect;
    use clipfeed_models::{JobStatus, SourceStatus};

    async fn fresh_handle() -> (DialectHandle, Id, Id, Id) {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();

        let owner = Id::new();
        let other = Id::new();
        let scout_source = Id::new();
        let candidate = Id::new();

        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?,'a','a@example.com','h')")
            .bind(owner.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?,'b','b@example.com','h')")
            .bind(other.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO scout_sources (id, owner_id, platform) VALUES (?, ?, 'youtube')")
            .bind(scout_source.to_string())
            .bind(owner.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO scout_candidates (id, scout_source_id, url, status) \
             VALUES (?, ?, 'https://www.youtube.com/watch?v=xyz', 'pending')",
        )
        .bind(candidate.to_string())
        .bind(scout_source.to_string())
        .execute(handle.pool())
        .await
        .unwrap();

        (handle, owner, other, candidate)
    }

    #[tokio::test]
    async fn owner_can_approve_a_pending_candidate() {
        let (handle, owner, _other, candidate) = fresh_handle().await;

        let (source, job) = approve_candidate(&handle, candidate, owner).await.unwrap();
        assert_eq!(source.status, SourceStatus::Pending);
        assert_eq!(job.status, JobStatus::Queued);

        let status: String = sqlx::query_scalar("SELECT status FROM scout_candidates WHERE id = ?")
            .bind(candidate.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(status, "ingested");
    }

    #[tokio::test]
    async fn non_owner_is_forbidden() {
        let (handle, _owner, other, candidate) = fresh_handle().await;

        let err = approve_candidate(&handle, candidate, other).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[tokio::test]
    async fn already_ingested_candidate_is_rejected() {
        let (handle, owner, _other, candidate) = fresh_handle().await;

        approve_candidate(&handle, candidate, owner).await.unwrap();
        let err = approve_candidate(&handle, candidate, owner).await.unwrap_err();
        assert!(matches!(err, Error::NotPending));
    }

    #[tokio::test]
    async fn unknown_candidate_is_not_found() {
        let (handle, owner, _other, _candidate) = fresh_handle().await;
        let missing = Id::new();

        let err = approve_candidate(&handle, missing, owner).await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }
}
