//! Worker-facing internal API (§4.4, §4.5, §4.12, §6), gated by the
//! shared-secret [`WorkerAuth`](crate::routes::WorkerAuth) extractor
//! instead of a per-user bearer token.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use clipfeed_ingest::CreateClipRequest;
use clipfeed_models::{Clip, CookiePlatform, Id, Job, JobUpdate, ReclaimCounts};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::error::ApiError;
use crate::routes::WorkerAuth;
use crate::state::App;

pub async fn claim_job(State(app): State<Arc<App>>, _auth: WorkerAuth) -> Result<Json<Option<Job>>, ApiError> {
    Ok(Json(clipfeed_queue::claim(&app.handle).await?))
}

pub async fn update_job(
    State(app): State<Arc<App>>,
    _auth: WorkerAuth,
    Path(job_id): Path<Id>,
    Json(req): Json<JobUpdate>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(clipfeed_queue::update(&app.handle, job_id, req).await?))
}

pub async fn reclaim_jobs(State(app): State<Arc<App>>, _auth: WorkerAuth) -> Result<Json<ReclaimCounts>, ApiError> {
    let counts = clipfeed_queue::reclaim_stale(&app.handle, app.config.job_stale_cutoff_minutes).await?;
    Ok(Json(counts))
}

#[derive(Debug, Serialize)]
pub struct SourceCookieResponse {
    pub cookie: Option<String>,
}

/// Decrypts and returns the submitting user's stored cookie for the
/// source's platform, if any (§4.12) — a direct file/url `Source`
/// (`Platform::Direct`) has no matching `CookiePlatform` and always
/// answers `None`.
pub async fn source_cookie(
    State(app): State<Arc<App>>,
    _auth: WorkerAuth,
    Path(source_id): Path<Id>,
) -> Result<Json<SourceCookieResponse>, ApiError> {
    let row = sqlx::query(app.handle.query("SELECT submitted_by, platform FROM sources WHERE id = ?").as_str())
        .bind(source_id.to_string())
        .fetch_optional(app.handle.pool())
        .await?
        .ok_or_else(|| ApiError::not_found("source not found"))?;

    let submitted_by: String = row.try_get("submitted_by")?;
    let platform: String = row.try_get("platform")?;
    let user_id: Id = submitted_by.parse()?;

    let Some(platform) = source_platform_to_cookie_platform(&platform) else {
        return Ok(Json(SourceCookieResponse { cookie: None }));
    };

    let stored = clipfeed_security::load(&app.handle, user_id, platform).await?;
    let cookie = stored.and_then(|row| app.cookie_vault.decrypt(&row.encrypted_value));
    Ok(Json(SourceCookieResponse { cookie }))
}

/// `sources.platform` is stored as [`Platform::as_db_str`]; only the
/// four platforms the cookie vault covers (§4.12) have a corresponding
/// [`CookiePlatform`] — `vimeo` and `direct` sources never carry one.
fn source_platform_to_cookie_platform(platform: &str) -> Option<CookiePlatform> {
    CookiePlatform::from_db_str(platform)
}

#[derive(Debug, Deserialize)]
pub struct CreateClipBody {
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
    #[serde(default)]
    pub topic_names: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub text_embedding: Option<Vec<u8>>,
    pub visual_embedding: Option<Vec<u8>>,
    pub embedding_model_version: Option<String>,
}

impl From<CreateClipBody> for CreateClipRequest {
    fn from(body: CreateClipBody) -> Self {
        Self {
            source_id: body.source_id,
            title: body.title,
            duration_seconds: body.duration_seconds,
            start_time: body.start_time,
            end_time: body.end_time,
            storage_key: body.storage_key,
            thumbnail_key: body.thumbnail_key,
            width: body.width,
            height: body.height,
            file_size_bytes: body.file_size_bytes,
            transcript: body.transcript,
            topic_names: body.topic_names,
            tags: body.tags,
            text_embedding: body.text_embedding,
            visual_embedding: body.visual_embedding,
            embedding_model_version: body.embedding_model_version,
        }
    }
}

pub async fn create_clip(
    State(app): State<Arc<App>>,
    _auth: WorkerAuth,
    Json(req): Json<CreateClipBody>,
) -> Result<(StatusCode, Json<Clip>), ApiError> {
    let clip = clipfeed_ingest::create_clip(&app.handle, req.into()).await?;
    Ok((StatusCode::CREATED, Json(clip)))
}

#[derive(Debug, Deserialize)]
pub struct ResolveTopicRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveTopicResponse {
    pub id: Id,
}

pub async fn resolve_topic(
    State(app): State<Arc<App>>,
    _auth: WorkerAuth,
    Json(req): Json<ResolveTopicRequest>,
) -> Result<Json<ResolveTopicResponse>, ApiError> {
    let id = clipfeed_ingest::resolve_topic(&app.handle, &req.name).await?;
    Ok(Json(ResolveTopicResponse { id }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    pub clip_id: Id,
    #[serde(default)]
    pub content_score: Option<f64>,
}

/// A worker reports a refreshed content score after reprocessing a clip
/// (§4.7's recall/score inputs) — there is no dedicated scoring library
/// call for this, just a direct column write, the same as the teacher's
/// worker-callback handlers write derived columns straight back.
pub async fn update_scores(
    State(app): State<Arc<App>>,
    _auth: WorkerAuth,
    Json(req): Json<UpdateScoreRequest>,
) -> Result<StatusCode, ApiError> {
    let Some(content_score) = req.content_score else {
        return Ok(StatusCode::NO_CONTENT);
    };

    let result = sqlx::query(app.handle.query("UPDATE clips SET content_score = ? WHERE id = ?").as_str())
        .bind(content_score)
        .bind(req.clip_id.to_string())
        .execute(app.handle.pool())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("clip not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
