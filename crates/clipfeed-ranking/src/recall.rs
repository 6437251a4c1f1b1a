use std::collections::HashMap;

use clipfeed_dialect::{Dialect, DialectHandle};
use clipfeed_models::Id;
use sqlx::Row;

use crate::candidate::Candidate;
use crate::Error;

/// Stage A of the ranking pipeline (§4.7): over-fetches 3x the requested
/// page size, ordered by an exploration/exploitation blend that differs
/// for authenticated vs. anonymous callers.
pub struct RecallParams {
    pub page_size: usize,
    pub authenticated_user: Option<Id>,
    pub min_clip_seconds: f64,
    pub max_clip_seconds: f64,
    pub exploration_rate: f64,
    pub half_life_hours: f64,
    pub dedupe_seen_24h: bool,
}

const OVERFETCH_FACTOR: usize = 3;

pub async fn recall_candidates(
    handle: &DialectHandle,
    params: &RecallParams,
) -> Result<Vec<Candidate>, Error> {
    let dialect = handle.dialect();
    let age_expr = dialect.age_hours_expr("c.created_at");
    let order_expr = order_expr(dialect, params);

    let mut sql = format!(
        "SELECT c.id, c.source_id, c.title, c.duration_seconds, c.thumbnail_key, \
         c.content_score, c.file_size_bytes, \
         COALESCE(LENGTH(c.transcript), 0) as transcript_length, \
         ({age_expr}) as age_hours, s.channel_name, s.platform \
         FROM clips c LEFT JOIN sources s ON s.id = c.source_id \
         WHERE c.status = 'ready' AND c.duration_seconds BETWEEN ? AND ?"
    );

    let dedupe = params.authenticated_user.is_some() && params.dedupe_seen_24h;
    if dedupe {
        let recency = dialect.datetime_recency_expr("created_at");
        sql.push_str(&format!(
            " AND c.id NOT IN (SELECT clip_id FROM interactions WHERE user_id = ? AND {recency})"
        ));
    }

    sql.push_str(&format!(" ORDER BY {order_expr} LIMIT ?"));

    let limit = (params.page_size * OVERFETCH_FACTOR) as i64;
    let mut query = sqlx::query(handle.query(&sql).as_str())
        .bind(params.min_clip_seconds)
        .bind(params.max_clip_seconds);

    if dedupe {
        query = query
            .bind(params.authenticated_user.unwrap().to_string())
            .bind(-1i64);
    }

    let rows = query.bind(limit).fetch_all(handle.pool()).await?;

    let mut candidates = Vec::with_capacity(rows.len());
    let mut ids = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: Id = parse_id(&row.try_get::<String, _>("id")?)?;
        let source_id: Option<String> = row.try_get("source_id")?;
        let source_id = source_id.as_deref().map(parse_id).transpose()?;

        ids.push(id);
        candidates.push(Candidate {
            id,
            source_id,
            title: row.try_get("title")?,
            duration_seconds: row.try_get("duration_seconds")?,
            thumbnail_key: row.try_get("thumbnail_key")?,
            content_score: row.try_get("content_score")?,
            topic_ids: Vec::new(),
            channel_name: row.try_get("channel_name")?,
            platform: row.try_get("platform")?,
            transcript_length: row.try_get("transcript_length")?,
            file_size_bytes: row.try_get("file_size_bytes")?,
            age_hours: row.try_get("age_hours")?,
            text_embedding: None,
            visual_embedding: None,
            l2r_score: 0.0,
            score: 0.0,
            div_score: 0.0,
        });
    }

    let topics_by_clip = load_clip_topics(handle, &ids).await?;
    for candidate in &mut candidates {
        if let Some(topics) = topics_by_clip.get(&candidate.id) {
            candidate.topic_ids = topics.clone();
        }
    }

    Ok(candidates)
}

pub(crate) fn order_expr(dialect: Dialect, params: &RecallParams) -> String {
    let age_expr = dialect.age_hours_expr("c.created_at");
    let random_expr = dialect.random_float_expr();

    if params.authenticated_user.is_some() {
        let exploration = params.exploration_rate.clamp(0.0, 1.0);
        format!(
            "c.content_score * exp(-({age_expr}) / {half_life:.6}) * {retain:.6} + {random_expr} * {exploration:.6} DESC",
            half_life = params.half_life_hours.max(f64::MIN_POSITIVE),
            retain = 1.0 - exploration,
            exploration = exploration,
        )
    } else {
        format!("c.content_score * exp(-({age_expr}) / 168.0) * 0.7 + {random_expr} * 0.3 DESC")
    }
}

/// Batch-loads `clip_topics` for a page of recalled clips, grouped by clip.
/// Kept as a second query rather than a dialect-specific array aggregation
/// so the recall query itself stays a plain `SELECT`.
pub(crate) async fn load_clip_topics(
    handle: &DialectHandle,
    clip_ids: &[Id],
) -> Result<HashMap<Id, Vec<Id>>, Error> {
    let mut by_clip: HashMap<Id, Vec<Id>> = HashMap::new();
    if clip_ids.is_empty() {
        return Ok(by_clip);
    }

    let placeholders = std::iter::repeat("?")
        .take(clip_ids.len())
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT clip_id, topic_id FROM clip_topics WHERE clip_id IN ({placeholders})");

    let mut query = sqlx::query(handle.query(&sql).as_str());
    for id in clip_ids {
        query = query.bind(id.to_string());
    }

    let rows = query.fetch_all(handle.pool()).await?;
    for row in &rows {
        let clip_id = parse_id(&row.try_get::<String, _>("clip_id")?)?;
        let topic_id = parse_id(&row.try_get::<String, _>("topic_id")?)?;
        by_clip.entry(clip_id).or_default().push(topic_id);
    }

    Ok(by_clip)
}

pub(crate) fn parse_id(s: &str) -> Result<Id, Error> {
    s.parse::<Id>()
        .map_err(|err| Error::MalformedRow(format!("invalid id {s:?}: {err}")))
}
