use clipfeed_dialect::DialectHandle;
use clipfeed_models::{Id, SavedFilterBody, TopicFilterMode};
use clipfeed_topics::TopicSnapshot;
use sqlx::Row;

use crate::candidate::Candidate;
use crate::recall::{self, RecallParams};
use crate::Error;

/// Parameters for recalling candidates under a saved filter (§4.7 "Saved
/// filters"). The filter replaces the candidate-recall SQL's WHERE clause;
/// the same exploration/freshness ORDER BY formula as the unfiltered feed
/// still applies, since later pipeline stages expect a pre-ranked pool.
pub struct SavedFilterRecallParams<'a> {
    pub filter: &'a SavedFilterBody,
    pub user_id: Id,
    pub exploration_rate: f64,
    pub half_life_hours: f64,
    pub page_size: usize,
}

enum Bind {
    Text(String),
    F64(f64),
    I64(i64),
}

pub async fn recall_with_filter(
    handle: &DialectHandle,
    params: &SavedFilterRecallParams<'_>,
    snapshot: &TopicSnapshot,
) -> Result<Vec<Candidate>, Error> {
    let dialect = handle.dialect();
    let age_expr = dialect.age_hours_expr("c.created_at");

    let mut clauses = vec!["c.status = 'ready'".to_string()];
    let mut binds = Vec::new();

    if let Some(min) = params.filter.duration.min {
        clauses.push("c.duration_seconds >= ?".to_string());
        binds.push(Bind::F64(min));
    }
    if let Some(max) = params.filter.duration.max {
        clauses.push("c.duration_seconds <= ?".to_string());
        binds.push(Bind::F64(max));
    }
    if let Some(min_score) = params.filter.min_score {
        clauses.push("c.content_score >= ?".to_string());
        binds.push(Bind::F64(min_score));
    }
    if let Some(recency_days) = params.filter.recency_days {
        let recency = dialect.datetime_recency_expr("c.created_at");
        clauses.push(recency);
        binds.push(Bind::I64(-recency_days));
    }

    if !params.filter.channels.is_empty() {
        let placeholders = placeholders(params.filter.channels.len());
        clauses.push(format!("s.channel_name IN ({placeholders})"));
        for channel in &params.filter.channels {
            binds.push(Bind::Text(channel.clone()));
        }
    }

    let mode = params.filter.topics.mode.unwrap_or(TopicFilterMode::Names);

    if !params.filter.topics.include.is_empty() {
        let ids = expand_topic_ids(&params.filter.topics.include, mode, snapshot);
        if ids.is_empty() {
            // Named topics that don't resolve in the graph match nothing.
            clauses.push("1 = 0".to_string());
        } else {
            let placeholders = placeholders(ids.len());
            clauses.push(format!(
                "c.id IN (SELECT clip_id FROM clip_topics WHERE topic_id IN ({placeholders}))"
            ));
            for id in ids {
                binds.push(Bind::Text(id.to_string()));
            }
        }
    }

    if !params.filter.topics.exclude.is_empty() {
        let ids = expand_topic_ids(&params.filter.topics.exclude, mode, snapshot);
        if !ids.is_empty() {
            let placeholders = placeholders(ids.len());
            clauses.push(format!(
                "c.id NOT IN (SELECT clip_id FROM clip_topics WHERE topic_id IN ({placeholders}))"
            ));
            for id in ids {
                binds.push(Bind::Text(id.to_string()));
            }
        }
    }

    let order_expr = recall::order_expr(
        dialect,
        &RecallParams {
            page_size: params.page_size,
            authenticated_user: Some(params.user_id),
            min_clip_seconds: 0.0,
            max_clip_seconds: 0.0,
            exploration_rate: params.exploration_rate,
            half_life_hours: params.half_life_hours,
            dedupe_seen_24h: false,
        },
    );

    let sql = format!(
        "SELECT c.id, c.source_id, c.title, c.duration_seconds, c.thumbnail_key, \
         c.content_score, c.file_size_bytes, \
         COALESCE(LENGTH(c.transcript), 0) as transcript_length, \
         ({age_expr}) as age_hours, s.channel_name, s.platform \
         FROM clips c LEFT JOIN sources s ON s.id = c.source_id \
         WHERE {where_clause} ORDER BY {order_expr} LIMIT ?",
        where_clause = clauses.join(" AND "),
    );

    let mut query = sqlx::query(handle.query(&sql).as_str());
    for bind in binds {
        query = match bind {
            Bind::Text(t) => query.bind(t),
            Bind::F64(f) => query.bind(f),
            Bind::I64(i) => query.bind(i),
        };
    }
    let limit = (params.page_size * 3) as i64;
    let rows = query.bind(limit).fetch_all(handle.pool()).await?;

    let mut candidates = Vec::with_capacity(rows.len());
    let mut ids = Vec::with_capacity(rows.len());
    for row in &rows {
        let id = recall::parse_id(&row.try_get::<String, _>("id")?)?;
        let source_id: Option<String> = row.try_get("source_id")?;
        let source_id = source_id.as_deref().map(recall::parse_id).transpose()?;

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

    let topics_by_clip = recall::load_clip_topics(handle, &ids).await?;
    for candidate in &mut candidates {
        if let Some(topics) = topics_by_clip.get(&candidate.id) {
            candidate.topic_ids = topics.clone();
        }
    }

    Ok(candidates)
}

fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(", ")
}

/// Resolves a list of topic names to topic IDs. Under `descendants` mode,
/// each resolved topic is expanded to its entire subtree via a DFS over
/// the in-memory graph (§4.7).
fn expand_topic_ids(names: &[String], mode: TopicFilterMode, snapshot: &TopicSnapshot) -> Vec<Id> {
    let mut ids = Vec::new();
    for name in names {
        let resolved = snapshot
            .by_name(name)
            .or_else(|| snapshot.by_slug(&clipfeed_models::slugify(name)));
        let Some(node) = resolved else { continue };

        match mode {
            TopicFilterMode::Names => ids.push(node.id),
            TopicFilterMode::Descendants => collect_subtree(node.id, snapshot, &mut ids),
        }
    }
    ids
}

fn collect_subtree(id: Id, snapshot: &TopicSnapshot, out: &mut Vec<Id>) {
    out.push(id);
    for &child in snapshot.children_of(Some(id)) {
        collect_subtree(child, snapshot, out);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_models::{DurationFilter, TopicFilter};

    fn empty_filter() -> SavedFilterBody {
        SavedFilterBody {
            topics: TopicFilter::default(),
            channels: vec![],
            duration: DurationFilter::default(),
            recency_days: None,
            min_score: None,
        }
    }

    #[tokio::test]
    async fn filters_by_duration_and_min_score() {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, clipfeed_dialect::Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();

        let short_low = Id::new();
        let long_high = Id::new();
        sqlx::query(
            "INSERT INTO clips (id, title, duration_seconds, start_time, end_time, storage_key, \
             file_size_bytes, content_score, status) VALUES \
             (?, 's', 10.0, 0.0, 10.0, 'k', 1, 0.1, 'ready'), \
             (?, 'l', 100.0, 0.0, 100.0, 'k', 1, 0.9, 'ready')",
        )
        .bind(short_low.to_string())
        .bind(long_high.to_string())
        .execute(handle.pool())
        .await
        .unwrap();

        let mut filter = empty_filter();
        filter.duration.min = Some(50.0);
        filter.min_score = Some(0.5);

        let snapshot = TopicSnapshot::default();
        let params = SavedFilterRecallParams {
            filter: &filter,
            user_id: Id::new(),
            exploration_rate: 0.0,
            half_life_hours: 168.0,
            page_size: 10,
        };

        let candidates = recall_with_filter(&handle, &params, &snapshot).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, long_high);
    }
}
