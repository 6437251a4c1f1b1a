use chrono::{DateTime, Utc};
use clipfeed_dialect::Dialect;
use clipfeed_models::{Id, Job, JobStatus, OpaqueJson, Platform, Source, SourceStatus};

use crate::Error;

/// The 2-row write shared by direct URL submission and scout-candidate
/// approval (§4.5, §4.9): a `pending` source and its paired `download`
/// job, inserted on the same connection so both succeed or neither does.
pub(crate) async fn insert_source_and_job(
    conn: &mut sqlx::AnyConnection,
    dialect: Dialect,
    submitted_by: Id,
    url: String,
    platform: Platform,
    now: DateTime<Utc>,
) -> Result<(Source, Job), Error> {
    let source_id = Id::new();
    let job_id = Id::new();

    let sql = dialect.rewrite(
        "INSERT INTO sources (id, url, platform, submitted_by, status, created_at) \
         VALUES (?, ?, ?, ?, 'pending', ?)",
    );
    sqlx::query(&sql)
        .bind(source_id.to_string())
        .bind(url.clone())
        .bind(platform.as_db_str())
        .bind(submitted_by.to_string())
        .bind(now.to_rfc3339())
        .execute(&mut *conn)
        .await?;

    let payload = OpaqueJson(serde_json::json!({ "url": url }));
    let sql = dialect.rewrite(
        "INSERT INTO jobs (id, source_id, job_type, status, payload, attempts, max_attempts, created_at) \
         VALUES (?, ?, 'download', 'queued', ?, 0, ?, ?)",
    );
    sqlx::query(&sql)
        .bind(job_id.to_string())
        .bind(source_id.to_string())
        .bind(payload.to_db_string())
        .bind(Job::DEFAULT_MAX_ATTEMPTS)
        .bind(now.to_rfc3339())
        .execute(&mut *conn)
        .await?;

    let source = Source {
        id: source_id,
        url,
        platform,
        external_id: None,
        title: None,
        channel_name: None,
        duration_seconds: None,
        thumbnail_url: None,
        metadata: None,
        status: SourceStatus::Pending,
        submitted_by,
        created_at: now,
    };
    let job = Job {
        id: job_id,
        source_id,
        job_type: "download".to_string(),
        status: JobStatus::Queued,
        priority: 0,
        payload: Some(payload),
        result: None,
        error: None,
        attempts: 0,
        max_attempts: Job::DEFAULT_MAX_ATTEMPTS,
        run_after: None,
        started_at: None,
        completed_at: None,
        created_at: now,
    };

    Ok((source, job))
}

pub(crate) fn parse_id(s: &str) -> Result<Id, Error> {
    s.parse::<Id>()
        .map_err(|err| Error::MalformedRow(format!("invalid id {s:?}: {err}")))
}
