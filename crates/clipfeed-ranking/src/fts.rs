use clipfeed_dialect::{Dialect, DialectHandle};
use sqlx::Row;

use crate::candidate::Candidate;
use crate::recall;
use crate::Error;

/// Full-text search over clips (§4.10). Two backend-specific query shapes
/// share one call site: callers always pass a raw user query string, and
/// the adapter sanitizes it per dialect before binding.
pub async fn search_clips(
    handle: &DialectHandle,
    raw_query: &str,
    limit: usize,
) -> Result<Vec<Candidate>, Error> {
    let dialect = handle.dialect();
    let sanitized = sanitize_query(dialect, raw_query);

    let sql = match dialect {
        Dialect::Embedded => {
            "SELECT c.id, c.source_id, c.title, c.duration_seconds, c.thumbnail_key, \
             c.content_score, c.file_size_bytes, \
             COALESCE(LENGTH(c.transcript), 0) as transcript_length, \
             (julianday('now') - julianday(c.created_at)) * 24.0 as age_hours, \
             s.channel_name, s.platform \
             FROM clips_fts \
             JOIN clips c ON c.id = clips_fts.clip_id \
             LEFT JOIN sources s ON s.id = c.source_id \
             WHERE clips_fts MATCH ? AND c.status = 'ready' \
             ORDER BY bm25(clips_fts), c.content_score DESC \
             LIMIT ?"
        }
        Dialect::ClientServer => {
            "SELECT c.id, c.source_id, c.title, c.duration_seconds, c.thumbnail_key, \
             c.content_score, c.file_size_bytes, \
             COALESCE(LENGTH(c.transcript), 0) as transcript_length, \
             (extract(epoch from (now() - c.created_at)) / 3600.0) as age_hours, \
             s.channel_name, s.platform \
             FROM clips c \
             LEFT JOIN sources s ON s.id = c.source_id \
             WHERE c.fts_document @@ plainto_tsquery('english', ?) AND c.status = 'ready' \
             ORDER BY ts_rank(c.fts_document, plainto_tsquery('english', ?)) DESC, c.content_score DESC \
             LIMIT ?"
        }
    };

    let mut query = sqlx::query(handle.query(sql).as_str()).bind(sanitized.clone());
    if dialect == Dialect::ClientServer {
        query = query.bind(sanitized);
    }
    let rows = query.bind(limit as i64).fetch_all(handle.pool()).await?;

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

/// Sanitizes a raw user query per dialect (§4.10). The embedded backend's
/// FTS5 `MATCH` syntax treats bare `AND`/`OR`/`NOT`/`NEAR` as query
/// operators; wrapping the input in a doubled-quote phrase reduces it to a
/// literal phrase match and closes that injection path. The client-server
/// backend's `plainto_tsquery` already treats its input as plain text, so
/// no escaping is needed there.
fn sanitize_query(dialect: Dialect, raw_query: &str) -> String {
    match dialect {
        Dialect::Embedded => {
            let escaped = raw_query.replace('"', "\"\"");
            format!("\"{escaped}\"")
        }
        Dialect::ClientServer => raw_query.to_string(),
    }
}

/// Used by the ingestion path and migrations to know whether an FTS row
/// must be written explicitly (embedded) or is maintained by a database
/// trigger (client-server) — see §4.5 and §4.10.
pub fn requires_explicit_fts_row(dialect: Dialect) -> bool {
    matches!(dialect, Dialect::Embedded)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn embedded_sanitization_wraps_in_a_phrase_query() {
        let sanitized = sanitize_query(Dialect::Embedded, "pasta recipes");
        assert_eq!(sanitized, "\"pasta recipes\"");
    }

    #[test]
    fn embedded_sanitization_neutralizes_operator_injection() {
        let sanitized = sanitize_query(Dialect::Embedded, "pasta OR DROP");
        assert_eq!(sanitized, "\"pasta OR DROP\"");
        // Still a single phrase: no unescaped quote boundary for FTS5 to
        // reinterpret as a new query operator.
        assert_eq!(sanitized.matches('"').count(), 2);
    }

    #[test]
    fn embedded_sanitization_doubles_embedded_quotes() {
        let sanitized = sanitize_query(Dialect::Embedded, "say \"hi\"");
        assert_eq!(sanitized, "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn client_server_sanitization_is_passthrough() {
        assert_eq!(sanitize_query(Dialect::ClientServer, "pasta OR DROP"), "pasta OR DROP");
    }
}
