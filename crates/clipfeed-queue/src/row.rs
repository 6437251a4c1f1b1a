use std::str::FromStr;

use clipfeed_dialect::Dialect;
use clipfeed_models::{Id, Job, JobStatus, OpaqueJson};
use sqlx::{Any, Executor, Row};

use crate::Error;

/// Fetches a single job by id, projecting its timestamp columns through
/// [`Dialect::timestamp_text_expr`] so decoding never has to branch on the
/// backend's native timestamp representation.
pub(crate) async fn fetch_job_by_id<'c, E>(
    executor: E,
    dialect: Dialect,
    id: Id,
) -> Result<Option<Job>, Error>
where
    E: Executor<'c, Database = Any>,
{
    let sql = format!(
        "SELECT id, source_id, job_type, status, priority, payload, result, error, \
         attempts, max_attempts, {run_after}, {started_at}, {completed_at}, {created_at} \
         FROM jobs WHERE id = ?",
        run_after = dialect.timestamp_text_expr("run_after"),
        started_at = dialect.timestamp_text_expr("started_at"),
        completed_at = dialect.timestamp_text_expr("completed_at"),
        created_at = dialect.timestamp_text_expr("created_at"),
    );
    let sql = dialect.rewrite(&sql);

    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(job_from_row).transpose()
}

pub(crate) fn job_from_row(row: &sqlx::any::AnyRow) -> Result<Job, Error> {
    let id: String = row.try_get("id")?;
    let source_id: String = row.try_get("source_id")?;
    let job_type: String = row.try_get("job_type")?;
    let status: String = row.try_get("status")?;
    let priority: i32 = row.try_get("priority")?;
    let payload: Option<String> = row.try_get("payload")?;
    let result: Option<String> = row.try_get("result")?;
    let error: Option<String> = row.try_get("error")?;
    let attempts: i32 = row.try_get("attempts")?;
    let max_attempts: i32 = row.try_get("max_attempts")?;
    let run_after: Option<String> = row.try_get("run_after")?;
    let started_at: Option<String> = row.try_get("started_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Job {
        id: parse_id(&id)?,
        source_id: parse_id(&source_id)?,
        job_type,
        status: JobStatus::from_db_str(&status)
            .ok_or_else(|| Error::MalformedRow(format!("unknown job status {status:?}")))?,
        priority,
        payload: OpaqueJson::from_db_option(payload)?,
        result: OpaqueJson::from_db_option(result)?,
        error,
        attempts,
        max_attempts,
        run_after: parse_ts_opt(run_after)?,
        started_at: parse_ts_opt(started_at)?,
        completed_at: parse_ts_opt(completed_at)?,
        created_at: parse_ts(&created_at)?,
    })
}

pub(crate) fn parse_id(s: &str) -> Result<Id, Error> {
    Id::from_str(s).map_err(|err| Error::MalformedRow(format!("invalid id {s:?}: {err}")))
}

pub(crate) fn parse_ts(s: &str) -> Result<chrono::DateTime<chrono::Utc>, Error> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|err| Error::MalformedRow(format!("invalid timestamp {s:?}: {err}")))
}

pub(crate) fn parse_ts_opt(
    s: Option<String>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, Error> {
    s.as_deref().map(parse_ts).transpose()
}
