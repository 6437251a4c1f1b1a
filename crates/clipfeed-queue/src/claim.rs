use clipfeed_dialect::{with_tx, DialectHandle};
use clipfeed_models::Job;

use crate::row::{fetch_job_by_id, parse_id};
use crate::Error;

/// Atomically claims the next eligible queued job (§4.4): priority DESC,
/// created_at ASC, skipping deferred jobs whose `run_after` is still in
/// the future. Returns `None` ("no work") when nothing is eligible.
///
/// On the client-server backend the inner `SELECT` takes `FOR UPDATE SKIP
/// LOCKED` so concurrent claimers land on distinct rows without blocking
/// each other; on the embedded backend the write-exclusive `BEGIN
/// IMMEDIATE` transaction already serializes claimers, so the clause is
/// a no-op there.
pub async fn claim(handle: &DialectHandle) -> Result<Option<Job>, Error> {
    with_tx(handle, |conn| async move {
        let dialect = handle.dialect();
        let now = dialect.now_utc_expr();

        let claim_sql = dialect.rewrite(&format!(
            "UPDATE jobs SET status = 'running', started_at = {now}, attempts = attempts + 1 \
             WHERE id = ( \
               SELECT id FROM jobs \
               WHERE status = 'queued' AND (run_after IS NULL OR run_after <= {now}) \
               ORDER BY priority DESC, created_at ASC \
               LIMIT 1 \
               {skip_locked} \
             ) RETURNING id",
            now = now,
            skip_locked = dialect.skip_locked_clause(),
        ));

        let claimed_id: Option<String> = sqlx::query_scalar(&claim_sql)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(claimed_id) = claimed_id else {
            return Ok(None);
        };

        let id = parse_id(&claimed_id)?;
        fetch_job_by_id(&mut *conn, dialect, id).await
    })
    .await
}
