use clipfeed_dialect::{with_tx, DialectHandle};
use clipfeed_models::{Id, Job, JobStatus, JobUpdate};
use sqlx::Row;

use crate::row::{fetch_job_by_id, parse_id};
use crate::util::append_error;
use crate::Error;

/// Applies a worker's reported transition to a `running` job (§4.4). The
/// only valid source state is `running`; any other current status is
/// rejected rather than silently ignored, since a worker racing a
/// cancellation or a duplicate callback must not be allowed to resurrect
/// or overwrite a job it no longer owns.
pub async fn update(handle: &DialectHandle, job_id: Id, req: JobUpdate) -> Result<Job, Error> {
    with_tx(handle, |conn| async move {
        let dialect = handle.dialect();
        let current = fetch_job_by_id(&mut *conn, dialect, job_id)
            .await?
            .ok_or(Error::NotFound)?;

        if current.status != JobStatus::Running {
            return Err(Error::InvalidTransition {
                from: current.status,
                to: req.status,
            });
        }

        match req.status {
            JobStatus::Complete => {
                let sql = dialect.rewrite(&format!(
                    "UPDATE jobs SET status = 'complete', completed_at = {now}, result = ? WHERE id = ?",
                    now = dialect.now_utc_expr(),
                ));
                sqlx::query(&sql)
                    .bind(req.result.as_ref().map(|r| r.to_db_string()))
                    .bind(job_id.to_string())
                    .execute(&mut *conn)
                    .await?;
            }
            JobStatus::Failed => {
                let sql = dialect.rewrite(&format!(
                    "UPDATE jobs SET status = 'failed', completed_at = {now}, error = ? WHERE id = ?",
                    now = dialect.now_utc_expr(),
                ));
                sqlx::query(&sql)
                    .bind(&req.error)
                    .bind(job_id.to_string())
                    .execute(&mut *conn)
                    .await?;
            }
            JobStatus::Rejected => {
                let sql = dialect.rewrite(&format!(
                    "UPDATE jobs SET status = 'rejected', completed_at = {now}, error = ? WHERE id = ?",
                    now = dialect.now_utc_expr(),
                ));
                sqlx::query(&sql)
                    .bind(&req.error)
                    .bind(job_id.to_string())
                    .execute(&mut *conn)
                    .await?;
            }
            JobStatus::Queued => {
                let error = req
                    .error
                    .as_deref()
                    .map(|message| append_error(current.error.as_deref(), message));
                let sql = dialect.rewrite(
                    "UPDATE jobs SET status = 'queued', run_after = ?, error = ? WHERE id = ?",
                );
                sqlx::query(&sql)
                    .bind(req.run_after.map(|ts| ts.to_rfc3339()))
                    .bind(error)
                    .bind(job_id.to_string())
                    .execute(&mut *conn)
                    .await?;
            }
            JobStatus::Running | JobStatus::Cancelled => {
                return Err(Error::InvalidTransition {
                    from: current.status,
                    to: req.status,
                });
            }
        }

        fetch_job_by_id(&mut *conn, dialect, job_id)
            .await?
            .ok_or(Error::NotFound)
    })
    .await
}

/// Cancels a queued or running job on behalf of its owner (§4.4). The
/// linked source moves to `cancelled` alongside it; an in-flight worker
/// discovers the cancellation on its next progress report and must not
/// persist a clip for a job it finds cancelled.
pub async fn cancel(handle: &DialectHandle, job_id: Id, caller: Id) -> Result<Job, Error> {
    with_tx(handle, |conn| async move {
        let dialect = handle.dialect();
        let current = fetch_job_by_id(&mut *conn, dialect, job_id)
            .await?
            .ok_or(Error::NotFound)?;

        require_ownership(&mut *conn, current.source_id, caller).await?;

        if !matches!(current.status, JobStatus::Queued | JobStatus::Running) {
            return Err(Error::InvalidTransition {
                from: current.status,
                to: JobStatus::Cancelled,
            });
        }

        let sql = dialect.rewrite(&format!(
            "UPDATE jobs SET status = 'cancelled', completed_at = {now}, error = 'Cancelled by user' WHERE id = ?",
            now = dialect.now_utc_expr(),
        ));
        sqlx::query(&sql)
            .bind(job_id.to_string())
            .execute(&mut *conn)
            .await?;

        let sql = dialect.rewrite("UPDATE sources SET status = 'cancelled' WHERE id = ?");
        sqlx::query(&sql)
            .bind(current.source_id.to_string())
            .execute(&mut *conn)
            .await?;

        fetch_job_by_id(&mut *conn, dialect, job_id)
            .await?
            .ok_or(Error::NotFound)
    })
    .await
}

/// Resets a terminal job back to `queued` on behalf of its owner (§4.4),
/// clearing every field a fresh claim would otherwise see stale.
pub async fn retry(handle: &DialectHandle, job_id: Id, caller: Id) -> Result<Job, Error> {
    with_tx(handle, |conn| async move {
        let dialect = handle.dialect();
        let current = fetch_job_by_id(&mut *conn, dialect, job_id)
            .await?
            .ok_or(Error::NotFound)?;

        require_ownership(&mut *conn, current.source_id, caller).await?;

        if !matches!(
            current.status,
            JobStatus::Failed | JobStatus::Cancelled | JobStatus::Rejected
        ) {
            return Err(Error::InvalidTransition {
                from: current.status,
                to: JobStatus::Queued,
            });
        }

        let sql = dialect.rewrite(
            "UPDATE jobs SET status = 'queued', attempts = 0, run_after = NULL, \
             started_at = NULL, completed_at = NULL, error = NULL WHERE id = ?",
        );
        sqlx::query(&sql)
            .bind(job_id.to_string())
            .execute(&mut *conn)
            .await?;

        let sql = dialect.rewrite("UPDATE sources SET status = 'pending' WHERE id = ?");
        sqlx::query(&sql)
            .bind(current.source_id.to_string())
            .execute(&mut *conn)
            .await?;

        fetch_job_by_id(&mut *conn, dialect, job_id)
            .await?
            .ok_or(Error::NotFound)
    })
    .await
}

/// Deletes a terminal job on behalf of its owner (§4.4). Non-terminal
/// jobs (`queued`, `running`) must be cancelled first.
pub async fn dismiss(handle: &DialectHandle, job_id: Id, caller: Id) -> Result<(), Error> {
    with_tx(handle, |conn| async move {
        let dialect = handle.dialect();
        let current = fetch_job_by_id(&mut *conn, dialect, job_id)
            .await?
            .ok_or(Error::NotFound)?;

        require_ownership(&mut *conn, current.source_id, caller).await?;

        if !current.status.is_terminal() {
            return Err(Error::InvalidTransition {
                from: current.status,
                to: current.status,
            });
        }

        let sql = dialect.rewrite("DELETE FROM jobs WHERE id = ?");
        sqlx::query(&sql)
            .bind(job_id.to_string())
            .execute(&mut *conn)
            .await?;

        Ok(())
    })
    .await
}

async fn require_ownership(
    conn: &mut sqlx::AnyConnection,
    source_id: Id,
    caller: Id,
) -> Result<(), Error> {
    let row = sqlx::query("SELECT submitted_by FROM sources WHERE id = ?")
        .bind(source_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    let submitted_by: String = match row {
        Some(row) => row.try_get("submitted_by")?,
        None => return Err(Error::NotFound),
    };

    if parse_id(&submitted_by)? != caller {
        return Err(Error::Forbidden);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_dialect::Dialect;
    use clipfeed_models::OpaqueJson;

    async fn seeded_handle() -> (DialectHandle, Id, Id, Id, Id) {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();

        let owner = Id::new();
        let stranger = Id::new();
        let source_id = Id::new();
        let job_id = Id::new();
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?,'a','a@example.com','h')")
            .bind(owner.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?,'b','b@example.com','h')")
            .bind(stranger.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO sources (id, url, platform, submitted_by) VALUES (?,'https://x','direct',?)")
            .bind(source_id.to_string())
            .bind(owner.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO jobs (id, source_id, job_type, status, attempts, started_at) VALUES (?,?,'download','running',1,'2024-01-01T00:00:00.000Z')")
            .bind(job_id.to_string())
            .bind(source_id.to_string())
            .execute(handle.pool())
            .await
            .unwrap();

        (handle, owner, stranger, source_id, job_id)
    }

    #[tokio::test]
    async fn complete_persists_result() {
        let (handle, _owner, _stranger, _source_id, job_id) = seeded_handle().await;
        let job = update(
            &handle,
            job_id,
            JobUpdate {
                status: JobStatus::Complete,
                error: None,
                result: Some(OpaqueJson(serde_json::json!({"clip_id": "c1"}))),
                run_after: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(job.status, JobStatus::Complete);
        assert!(job.completed_at.is_some());
        assert_eq!(job.result.unwrap().0["clip_id"], "c1");
    }

    #[tokio::test]
    async fn requeue_does_not_touch_attempts() {
        let (handle, _owner, _stranger, _source_id, job_id) = seeded_handle().await;
        let job = update(
            &handle,
            job_id,
            JobUpdate {
                status: JobStatus::Queued,
                error: Some("timed out".to_string()),
                result: None,
                run_after: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.error.as_deref(), Some("timed out"));
    }

    #[tokio::test]
    async fn update_rejects_non_running_source_status() {
        let (handle, _owner, _stranger, _source_id, job_id) = seeded_handle().await;
        update(
            &handle,
            job_id,
            JobUpdate {
                status: JobStatus::Complete,
                error: None,
                result: None,
                run_after: None,
            },
        )
        .await
        .unwrap();

        let err = update(
            &handle,
            job_id,
            JobUpdate {
                status: JobStatus::Complete,
                error: None,
                result: None,
                run_after: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn cancel_is_rejected_for_non_owner() {
        let (handle, _owner, stranger, _source_id, job_id) = seeded_handle().await;
        let err = cancel(&handle, job_id, stranger).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[tokio::test]
    async fn cancel_moves_job_and_source_to_cancelled() {
        let (handle, owner, _stranger, source_id, job_id) = seeded_handle().await;
        let job = cancel(&handle, job_id, owner).await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.error.as_deref(), Some("Cancelled by user"));

        let source_status: String = sqlx::query("SELECT status FROM sources WHERE id = ?")
            .bind(source_id.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap()
            .try_get("status")
            .unwrap();
        assert_eq!(source_status, "cancelled");
    }

    #[tokio::test]
    async fn retry_resets_job_and_requeues_source() {
        let (handle, owner, _stranger, source_id, job_id) = seeded_handle().await;
        cancel(&handle, job_id, owner).await.unwrap();

        let job = retry(&handle, job_id, owner).await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 0);
        assert!(job.error.is_none());
        assert!(job.started_at.is_none());

        let source_status: String = sqlx::query("SELECT status FROM sources WHERE id = ?")
            .bind(source_id.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap()
            .try_get("status")
            .unwrap();
        assert_eq!(source_status, "pending");
    }

    #[tokio::test]
    async fn dismiss_requires_terminal_state() {
        let (handle, owner, _stranger, _source_id, job_id) = seeded_handle().await;
        let err = dismiss(&handle, job_id, owner).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        cancel(&handle, job_id, owner).await.unwrap();
        dismiss(&handle, job_id, owner).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE id = ?")
            .bind(job_id.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
