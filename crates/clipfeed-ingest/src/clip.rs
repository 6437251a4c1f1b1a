use std::collections::HashSet;

use chrono::Utc;
use clipfeed_dialect::{with_tx, Dialect, DialectHandle};
use clipfeed_models::{Clip, ClipStatus, Id};
use sqlx::Row;

use crate::create::parse_id;
use crate::Error;

/// The worker-callback request that materializes a downloaded clip
/// (§4.5). `topic_names` are resolved (or created) against the topic
/// graph as part of the same transaction.
#[derive(Clone, Debug, Default)]
pub struct CreateClipRequest {
    pub source_id: Option<Id>,
    pub title: String,
    pub duration_seconds: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub storage_key: String,
    pub thumbnail_key: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size_bytes: i64,
    pub transcript: Option<String>,
    pub topic_names: Vec<String>,
    pub tags: Vec<String>,
    pub text_embedding: Option<Vec<u8>>,
    pub visual_embedding: Option<Vec<u8>>,
    pub embedding_model_version: Option<String>,
}

/// Clip creation (§4.5): a 3-step transaction — insert the clip, resolve
/// or create each named topic and link it, insert the FTS index row, then
/// conditionally insert an embeddings row.
pub async fn create_clip(handle: &DialectHandle, req: CreateClipRequest) -> Result<Clip, Error> {
    with_tx(handle, |conn| async move {
        let dialect = handle.dialect();
        let now = Utc::now();
        let clip_id = Id::new();

        let topics_json = serde_json::to_string(&req.topic_names)?;
        let tags_json = serde_json::to_string(&req.tags)?;

        let sql = dialect.rewrite(
            "INSERT INTO clips (id, source_id, title, duration_seconds, start_time, end_time, \
             storage_key, thumbnail_key, width, height, file_size_bytes, transcript, topics, tags, \
             status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'ready', ?)",
        );
        sqlx::query(&sql)
            .bind(clip_id.to_string())
            .bind(req.source_id.map(|id| id.to_string()))
            .bind(&req.title)
            .bind(req.duration_seconds)
            .bind(req.start_time)
            .bind(req.end_time)
            .bind(&req.storage_key)
            .bind(&req.thumbnail_key)
            .bind(req.width)
            .bind(req.height)
            .bind(req.file_size_bytes)
            .bind(&req.transcript)
            .bind(&topics_json)
            .bind(&tags_json)
            .bind(now.to_rfc3339())
            .execute(&mut *conn)
            .await?;

        for name in dedupe_by_slug(&req.topic_names) {
            let topic_id = resolve_or_create_topic(&mut *conn, dialect, &name).await?;
            let sql = dialect.rewrite(
                "INSERT INTO clip_topics (clip_id, topic_id, confidence) VALUES (?, ?, 1.0)",
            );
            sqlx::query(&sql)
                .bind(clip_id.to_string())
                .bind(topic_id.to_string())
                .execute(&mut *conn)
                .await?;
        }

        // The embedded backend's FTS5 table is a plain virtual table with
        // no content-sync trigger, so the index row is inserted explicitly
        // here; the client-server backend maintains `clips.fts_document`
        // via a trigger on the `clips` row itself (see migrations).
        if dialect == Dialect::Embedded {
            sqlx::query(
                "INSERT INTO clips_fts (clip_id, title, transcript, tags) VALUES (?, ?, ?, ?)",
            )
            .bind(clip_id.to_string())
            .bind(&req.title)
            .bind(req.transcript.as_deref().unwrap_or(""))
            .bind(req.tags.join(" "))
            .execute(&mut *conn)
            .await?;
        }

        if req.text_embedding.is_some() || req.visual_embedding.is_some() {
            let model_version = req.embedding_model_version.clone().unwrap_or_default();
            let sql = dialect.rewrite(
                "INSERT INTO clip_embeddings (clip_id, text_embedding, visual_embedding, model_version) \
                 VALUES (?, ?, ?, ?)",
            );
            sqlx::query(&sql)
                .bind(clip_id.to_string())
                .bind(&req.text_embedding)
                .bind(&req.visual_embedding)
                .bind(model_version)
                .execute(&mut *conn)
                .await?;
        }

        Ok(Clip {
            id: clip_id,
            source_id: req.source_id,
            title: req.title,
            duration_seconds: req.duration_seconds,
            start_time: req.start_time,
            end_time: req.end_time,
            storage_key: req.storage_key,
            thumbnail_key: req.thumbnail_key,
            width: req.width,
            height: req.height,
            file_size_bytes: req.file_size_bytes,
            transcript: req.transcript,
            topics: req.topic_names,
            tags: req.tags,
            content_score: 0.5,
            expires_at: None,
            is_protected: false,
            status: ClipStatus::Ready,
            created_at: now,
        })
    })
    .await
}

/// Resolves (or creates) a single named topic, for the worker-facing
/// `/api/internal/topics/resolve` endpoint (§6) that lets a worker attach
/// topics to a clip it hasn't created yet.
pub async fn resolve_topic(handle: &DialectHandle, name: &str) -> Result<Id, Error> {
    with_tx(handle, |conn| async move { resolve_or_create_topic(&mut *conn, handle.dialect(), name).await }).await
}

/// Resolves a topic by slug or case-insensitive name, creating it on miss.
/// `ON CONFLICT ... DO NOTHING` plus a re-read makes this deterministic
/// under concurrent creators racing the same new topic name (§4.5).
async fn resolve_or_create_topic(
    conn: &mut sqlx::AnyConnection,
    dialect: Dialect,
    name: &str,
) -> Result<Id, Error> {
    let slug = clipfeed_models::slugify(name);

    let sql = dialect.rewrite("SELECT id FROM topics WHERE slug = ? OR lower(name) = lower(?)");
    let existing: Option<String> = sqlx::query_scalar(&sql)
        .bind(&slug)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(id) = existing {
        return parse_id(&id);
    }

    let topic_id = Id::new();
    let path = format!("/{slug}");
    let sql = dialect.rewrite(
        "INSERT INTO topics (id, name, slug, path, parent_id, depth, clip_count) \
         VALUES (?, ?, ?, ?, NULL, 0, 0) ON CONFLICT (slug) DO NOTHING",
    );
    sqlx::query(&sql)
        .bind(topic_id.to_string())
        .bind(name)
        .bind(&slug)
        .bind(&path)
        .execute(&mut *conn)
        .await?;

    let sql = dialect.rewrite("SELECT id FROM topics WHERE slug = ?");
    let row = sqlx::query(&sql)
        .bind(&slug)
        .fetch_one(&mut *conn)
        .await?;
    parse_id(&row.try_get::<String, _>("id")?)
}

fn dedupe_by_slug(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        if seen.insert(clipfeed_models::slugify(name)) {
            out.push(name.clone());
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use sqlx::Row as _;

    async fn fresh_handle() -> DialectHandle {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();
        handle
    }

    fn sample_req() -> CreateClipRequest {
        CreateClipRequest {
            source_id: None,
            title: "Carbonara in 60 seconds".to_string(),
            duration_seconds: 58.0,
            start_time: 0.0,
            end_time: 58.0,
            storage_key: "clips/abc/video.mp4".to_string(),
            thumbnail_key: None,
            width: Some(1080),
            height: Some(1920),
            file_size_bytes: 4_000_000,
            transcript: Some("boil the pasta".to_string()),
            topic_names: vec!["Cooking".to_string(), "Italian Cuisine".to_string()],
            tags: vec!["pasta".to_string()],
            text_embedding: None,
            visual_embedding: None,
            embedding_model_version: None,
        }
    }

    #[tokio::test]
    async fn creates_clip_and_resolves_new_topics() {
        let handle = fresh_handle().await;
        let clip = create_clip(&handle, sample_req()).await.unwrap();
        assert_eq!(clip.status, ClipStatus::Ready);

        let topic_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clip_topics WHERE clip_id = ?")
            .bind(clip.id.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(topic_count, 2);

        let fts_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clips_fts WHERE clip_id = ?")
            .bind(clip.id.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(fts_count, 1);
    }

    #[tokio::test]
    async fn reuses_an_existing_topic_by_case_insensitive_name() {
        let handle = fresh_handle().await;
        create_clip(&handle, sample_req()).await.unwrap();

        let mut second = sample_req();
        second.topic_names = vec!["cooking".to_string()];
        create_clip(&handle, second).await.unwrap();

        let topic_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topics WHERE slug = 'cooking'")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(topic_count, 1);
    }

    #[tokio::test]
    async fn duplicate_topic_names_in_one_request_are_deduped() {
        let handle = fresh_handle().await;
        let mut req = sample_req();
        req.topic_names = vec!["Cooking".to_string(), "cooking".to_string()];
        let clip = create_clip(&handle, req).await.unwrap();

        let topic_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clip_topics WHERE clip_id = ?")
            .bind(clip.id.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(topic_count, 1);
    }

    #[tokio::test]
    async fn stores_embeddings_when_provided() {
        let handle = fresh_handle().await;
        let mut req = sample_req();
        req.text_embedding = Some(vec![0, 1, 2, 3]);
        req.embedding_model_version = Some("clip-v1".to_string());
        let clip = create_clip(&handle, req).await.unwrap();

        let row = sqlx::query("SELECT model_version FROM clip_embeddings WHERE clip_id = ?")
            .bind(clip.id.to_string())
            .fetch_one(handle.pool())
            .await
            .unwrap();
        let version: String = row.try_get("model_version").unwrap();
        assert_eq!(version, "clip-v1");
    }

    #[tokio::test]
    async fn resolve_topic_creates_then_reuses_by_case_insensitive_name() {
        let handle = fresh_handle().await;
        let first = resolve_topic(&handle, "Cooking").await.unwrap();
        let second = resolve_topic(&handle, "cooking").await.unwrap();
        assert_eq!(first, second);

        let topic_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topics")
            .fetch_one(handle.pool())
            .await
            .unwrap();
        assert_eq!(topic_count, 1);
    }
}
