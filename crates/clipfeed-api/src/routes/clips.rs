//! Clip detail, streaming, similarity, interactions, and saves (§6).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::Redirect;
use axum::Json;
use clipfeed_models::{Clip, ClipStatus, Id, InteractionAction};
use clipfeed_ranking::SimilarClip;
use serde::Deserialize;
use sqlx::Row;
use validator::Validate;

use crate::error::ApiError;
use crate::routes::AuthUser;
use crate::state::App;

pub async fn get_clip(State(app): State<Arc<App>>, Path(clip_id): Path<Id>) -> Result<Json<Clip>, ApiError> {
    Ok(Json(load_clip(&app, clip_id).await?))
}

pub async fn stream_clip(State(app): State<Arc<App>>, Path(clip_id): Path<Id>) -> Result<Redirect, ApiError> {
    let clip = load_clip(&app, clip_id).await?;
    let url = app.storage.presign_get(&clip.storage_key, Duration::from_secs(3600));
    Ok(Redirect::temporary(&url))
}

pub async fn similar_clips(
    State(app): State<Arc<App>>,
    Path(clip_id): Path<Id>,
) -> Result<Json<Vec<SimilarClip>>, ApiError> {
    let similar = clipfeed_ranking::find_similar_clips(&app.handle, clip_id, 20).await?;
    Ok(Json(similar))
}

#[derive(Debug, Deserialize, Validate)]
pub struct InteractRequest {
    pub action: InteractionAction,
    #[validate(range(min = 0.0, max = 100_000.0))]
    pub watch_duration_seconds: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub watch_percentage: Option<f64>,
}

pub async fn interact(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(clip_id): Path<Id>,
    crate::extract::ValidatedJson(req): crate::extract::ValidatedJson<InteractRequest>,
) -> Result<axum::http::StatusCode, ApiError> {
    load_clip(&app, clip_id).await?;

    sqlx::query(
        app.handle
            .query(
                "INSERT INTO interactions (id, user_id, clip_id, action, watch_duration_seconds, watch_percentage) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .as_str(),
    )
    .bind(Id::new().to_string())
    .bind(user_id.to_string())
    .bind(clip_id.to_string())
    .bind(req.action.as_db_str())
    .bind(req.watch_duration_seconds)
    .bind(req.watch_percentage)
    .execute(app.handle.pool())
    .await?;

    Ok(axum::http::StatusCode::CREATED)
}

pub async fn save_clip(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(clip_id): Path<Id>,
) -> Result<axum::http::StatusCode, ApiError> {
    load_clip(&app, clip_id).await?;

    sqlx::query(
        app.handle
            .query("INSERT INTO saved_clips (user_id, clip_id) VALUES (?, ?) ON CONFLICT (user_id, clip_id) DO NOTHING")
            .as_str(),
    )
    .bind(user_id.to_string())
    .bind(clip_id.to_string())
    .execute(app.handle.pool())
    .await?;

    sync_protection(&app, clip_id).await?;
    Ok(axum::http::StatusCode::CREATED)
}

pub async fn unsave_clip(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(clip_id): Path<Id>,
) -> Result<axum::http::StatusCode, ApiError> {
    sqlx::query(app.handle.query("DELETE FROM saved_clips WHERE user_id = ? AND clip_id = ?").as_str())
        .bind(user_id.to_string())
        .bind(clip_id.to_string())
        .execute(app.handle.pool())
        .await?;

    sync_protection(&app, clip_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Recomputes `clips.is_protected` from the current save count (§4.9's
/// eviction guard). Shared with `routes::collections`, which writes the
/// same `saved_clips` rows through its synthetic single-collection model.
pub(crate) async fn sync_protection(app: &App, clip_id: Id) -> Result<(), ApiError> {
    let count: i64 = sqlx::query_scalar(app.handle.query("SELECT COUNT(*) FROM saved_clips WHERE clip_id = ?").as_str())
        .bind(clip_id.to_string())
        .fetch_one(app.handle.pool())
        .await?;

    sqlx::query(app.handle.query("UPDATE clips SET is_protected = ? WHERE id = ?").as_str())
        .bind(count > 0)
        .bind(clip_id.to_string())
        .execute(app.handle.pool())
        .await?;

    Ok(())
}

pub(crate) async fn load_clip(app: &App, clip_id: Id) -> Result<Clip, ApiError> {
    let row = sqlx::query(
        app.handle
            .query(
                "SELECT id, source_id, title, duration_seconds, start_time, end_time, storage_key, \
                 thumbnail_key, width, height, file_size_bytes, transcript, topics, tags, \
                 content_score, expires_at, is_protected, status, created_at \
                 FROM clips WHERE id = ?",
            )
            .as_str(),
    )
    .bind(clip_id.to_string())
    .fetch_optional(app.handle.pool())
    .await?
    .ok_or_else(|| ApiError::not_found("clip not found"))?;

    row_to_clip(&row)
}

fn row_to_clip(row: &sqlx::any::AnyRow) -> Result<Clip, ApiError> {
    let id: Id = row.try_get::<String, _>("id")?.parse()?;
    let source_id: Option<String> = row.try_get("source_id")?;
    let source_id = source_id.map(|s| s.parse()).transpose()?;
    let topics_json: String = row.try_get("topics")?;
    let tags_json: String = row.try_get("tags")?;
    let status: String = row.try_get("status")?;
    let expires_at: Option<String> = row.try_get("expires_at")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Clip {
        id,
        source_id,
        title: row.try_get("title")?,
        duration_seconds: row.try_get("duration_seconds")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        storage_key: row.try_get("storage_key")?,
        thumbnail_key: row.try_get("thumbnail_key")?,
        width: row.try_get("width")?,
        height: row.try_get("height")?,
        file_size_bytes: row.try_get("file_size_bytes")?,
        transcript: row.try_get("transcript")?,
        topics: serde_json::from_str(&topics_json)?,
        tags: serde_json::from_str(&tags_json)?,
        content_score: row.try_get("content_score")?,
        expires_at: expires_at.as_deref().map(parse_timestamp).transpose()?,
        is_protected: row.try_get::<i64, _>("is_protected")? != 0,
        status: ClipStatus::from_db_str(&status).ok_or_else(|| ApiError::new(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            anyhow::anyhow!("unknown clip status {status:?}"),
        ))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, ApiError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|err| ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("malformed timestamp: {err}")))
}
