use clipfeed_dialect::{with_tx, DialectHandle};

use crate::Error;

/// Admin purge (§4.4): deletes jobs that have aged out of a terminal state,
/// then gives any job still sitting in `failed` one last chance by
/// resetting its source to `pending` for manual re-submission before
/// clearing it too. Returns the total number of job rows removed.
pub async fn purge(handle: &DialectHandle) -> Result<u64, Error> {
    with_tx(handle, |conn| async move {
        let dialect = handle.dialect();
        let mut cleared: u64 = 0;

        let exhausted_failed_age =
            dialect.purge_datetime_comparison("COALESCE(completed_at, created_at)", "-48 hours");
        let sql = dialect.rewrite(&format!(
            "DELETE FROM jobs WHERE status = 'failed' AND attempts >= max_attempts AND {exhausted_failed_age}",
        ));
        let result = sqlx::query(&sql).execute(&mut *conn).await?;
        cleared += result.rows_affected();

        let rejected_age =
            dialect.purge_datetime_comparison("COALESCE(completed_at, created_at)", "-24 hours");
        let sql = dialect.rewrite(&format!(
            "DELETE FROM jobs WHERE status = 'rejected' AND {rejected_age}",
        ));
        let result = sqlx::query(&sql).execute(&mut *conn).await?;
        cleared += result.rows_affected();

        let sql = dialect.rewrite(
            "UPDATE sources SET status = 'pending' WHERE id IN \
             (SELECT source_id FROM jobs WHERE status = 'failed')",
        );
        sqlx::query(&sql).execute(&mut *conn).await?;

        let result = sqlx::query("DELETE FROM jobs WHERE status = 'failed'")
            .execute(&mut *conn)
            .await?;
        cleared += result.rows_affected();

        Ok(cleared)
    })
    .await
}
