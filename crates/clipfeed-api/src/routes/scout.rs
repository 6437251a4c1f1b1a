//! Scout sources, candidates, and the per-user scout profile (§4.9, §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use clipfeed_ingest::ScoutProfile;
use clipfeed_models::{Id, Job, OpaqueJson, ScoutSource, Source};
use serde::{Deserialize, Serialize};
use sqlx::error::DatabaseError;
use sqlx::Row;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::routes::AuthUser;
use crate::state::App;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSourceRequest {
    #[validate(length(min = 1, max = 32))]
    pub platform: String,
}

pub async fn list_sources(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ScoutSource>>, ApiError> {
    let rows = sqlx::query(
        app.handle
            .query("SELECT id, owner_id, platform, config, created_at FROM scout_sources WHERE owner_id = ?")
            .as_str(),
    )
    .bind(user_id.to_string())
    .fetch_all(app.handle.pool())
    .await?;

    rows.into_iter().map(|row| row_to_source(&row)).collect::<Result<_, _>>().map(Json)
}

pub async fn create_source(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateSourceRequest>,
) -> Result<(StatusCode, Json<ScoutSource>), ApiError> {
    let id = Id::new();
    let result = sqlx::query(
        app.handle
            .query("INSERT INTO scout_sources (id, owner_id, platform) VALUES (?, ?, ?)")
            .as_str(),
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(&req.platform)
    .execute(app.handle.pool())
    .await;

    if let Err(sqlx::Error::Database(db_err)) = &result {
        if db_err.is_unique_violation() {
            return Err(ApiError::conflict("a scout source for this platform already exists"));
        }
    }
    result?;

    let row = sqlx::query(
        app.handle
            .query("SELECT id, owner_id, platform, config, created_at FROM scout_sources WHERE id = ?")
            .as_str(),
    )
    .bind(id.to_string())
    .fetch_one(app.handle.pool())
    .await?;

    Ok((StatusCode::CREATED, Json(row_to_source(&row)?)))
}

pub async fn delete_source(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(source_id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    let owner: Option<String> =
        sqlx::query_scalar(app.handle.query("SELECT owner_id FROM scout_sources WHERE id = ?").as_str())
            .bind(source_id.to_string())
            .fetch_optional(app.handle.pool())
            .await?;
    let Some(owner) = owner else {
        return Err(ApiError::not_found("scout source not found"));
    };
    if owner.parse::<Id>()? != user_id {
        return Err(ApiError::forbidden_as_not_found("scout source not found"));
    }

    sqlx::query(app.handle.query("DELETE FROM scout_sources WHERE id = ?").as_str())
        .bind(source_id.to_string())
        .execute(app.handle.pool())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub source: Source,
    pub job: Job,
}

pub async fn approve(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(candidate_id): Path<Id>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let (source, job) = clipfeed_ingest::approve_candidate(&app.handle, candidate_id, user_id).await?;
    Ok(Json(ApproveResponse { source, job }))
}

#[derive(Debug, Serialize)]
pub struct ScoutProfileResponse {
    pub top_topics: Vec<(Id, f64)>,
    pub favorite_channels: Vec<(String, i64)>,
    pub pending_candidates: i64,
    pub ingested_candidates: i64,
    pub rejected_candidates: i64,
    pub scout_threshold: f64,
    pub scout_auto_ingest: bool,
}

impl From<ScoutProfile> for ScoutProfileResponse {
    fn from(profile: ScoutProfile) -> Self {
        Self {
            top_topics: profile.top_topics,
            favorite_channels: profile.favorite_channels,
            pending_candidates: profile.pending_candidates,
            ingested_candidates: profile.ingested_candidates,
            rejected_candidates: profile.rejected_candidates,
            scout_threshold: profile.scout_threshold,
            scout_auto_ingest: profile.scout_auto_ingest,
        }
    }
}

pub async fn profile(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ScoutProfileResponse>, ApiError> {
    let profile = clipfeed_ingest::load_scout_profile(&app.handle, user_id).await?;
    Ok(Json(profile.into()))
}

fn row_to_source(row: &sqlx::any::AnyRow) -> Result<ScoutSource, ApiError> {
    let id: String = row.try_get("id")?;
    let owner_id: String = row.try_get("owner_id")?;
    let config: Option<String> = row.try_get("config")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(ScoutSource {
        id: id.parse()?,
        owner_id: owner_id.parse()?,
        platform: row.try_get("platform")?,
        config: OpaqueJson::from_db_option(config)?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|err| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("malformed timestamp: {err}")))?,
    })
}
