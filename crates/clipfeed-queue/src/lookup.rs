use clipfeed_dialect::DialectHandle;
use clipfeed_models::{Id, Job};

use crate::row::{fetch_job_by_id, job_from_row};
use crate::Error;

/// Fetches a single job by id for a read-only caller outside this crate
/// (the HTTP API's job-detail route, §6). Ownership scoping is the
/// caller's concern — this performs none.
pub async fn get(handle: &DialectHandle, job_id: Id) -> Result<Option<Job>, Error> {
    fetch_job_by_id(handle.pool(), handle.dialect(), job_id).await
}

/// Lists every job belonging to a source `owner` submitted, newest first
/// (the HTTP API's job-list route, §6). Scoped by subquery rather than a
/// join so the per-column timestamp projection stays unambiguous between
/// `jobs` and `sources`, both of which carry a `created_at`.
pub async fn list_for_owner(handle: &DialectHandle, owner: Id) -> Result<Vec<Job>, Error> {
    let dialect = handle.dialect();
    let sql = format!(
        "SELECT id, source_id, job_type, status, priority, payload, result, error, \
         attempts, max_attempts, {run_after}, {started_at}, {completed_at}, {created_at} \
         FROM jobs WHERE source_id IN (SELECT id FROM sources WHERE submitted_by = ?) \
         ORDER BY created_at DESC",
        run_after = dialect.timestamp_text_expr("run_after"),
        started_at = dialect.timestamp_text_expr("started_at"),
        completed_at = dialect.timestamp_text_expr("completed_at"),
        created_at = dialect.timestamp_text_expr("created_at"),
    );
    let sql = dialect.rewrite(&sql);

    let rows = sqlx::query(&sql)
        .bind(owner.to_string())
        .fetch_all(handle.pool())
        .await?;

    rows.iter().map(job_from_row).collect()
}
