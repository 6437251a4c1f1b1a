//! Saved-clip collections (§6). The schema carries no `collections` table —
//! every account gets exactly one synthetic collection, `id == user_id`,
//! backed directly by `saved_clips` (the same table `routes::clips`'s
//! save/unsave handlers write to).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use clipfeed_models::Id;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::clips::sync_protection;
use crate::routes::AuthUser;
use crate::state::App;

#[derive(Debug, Serialize)]
pub struct Collection {
    pub id: Id,
    pub name: &'static str,
    pub clip_count: i64,
}

async fn synthetic_collection(app: &App, user_id: Id) -> Result<Collection, ApiError> {
    let clip_count: i64 =
        sqlx::query_scalar(app.handle.query("SELECT COUNT(*) FROM saved_clips WHERE user_id = ?").as_str())
            .bind(user_id.to_string())
            .fetch_one(app.handle.pool())
            .await?;
    Ok(Collection { id: user_id, name: "Saved", clip_count })
}

pub async fn list_collections(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Collection>>, ApiError> {
    Ok(Json(vec![synthetic_collection(&app, user_id).await?]))
}

pub async fn get_collection(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(collection_id): Path<Id>,
) -> Result<Json<Collection>, ApiError> {
    require_own_collection(collection_id, user_id)?;
    Ok(Json(synthetic_collection(&app, user_id).await?))
}

pub async fn create_collection(AuthUser(_user_id): AuthUser) -> Result<StatusCode, ApiError> {
    Err(ApiError::conflict(
        "every account has exactly one collection; additional collections are not supported",
    ))
}

pub async fn delete_collection(
    AuthUser(user_id): AuthUser,
    Path(collection_id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    require_own_collection(collection_id, user_id)?;
    Err(ApiError::conflict("the default collection cannot be deleted"))
}

#[derive(Debug, serde::Deserialize)]
pub struct AddClipRequest {
    pub clip_id: Id,
}

pub async fn add_clip(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(collection_id): Path<Id>,
    Json(req): Json<AddClipRequest>,
) -> Result<StatusCode, ApiError> {
    require_own_collection(collection_id, user_id)?;
    crate::routes::clips::load_clip(&app, req.clip_id).await?;

    sqlx::query(
        app.handle
            .query("INSERT INTO saved_clips (user_id, clip_id) VALUES (?, ?) ON CONFLICT (user_id, clip_id) DO NOTHING")
            .as_str(),
    )
    .bind(user_id.to_string())
    .bind(req.clip_id.to_string())
    .execute(app.handle.pool())
    .await?;

    sync_protection(&app, req.clip_id).await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_clip(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path((collection_id, clip_id)): Path<(Id, Id)>,
) -> Result<StatusCode, ApiError> {
    require_own_collection(collection_id, user_id)?;

    sqlx::query(app.handle.query("DELETE FROM saved_clips WHERE user_id = ? AND clip_id = ?").as_str())
        .bind(user_id.to_string())
        .bind(clip_id.to_string())
        .execute(app.handle.pool())
        .await?;

    sync_protection(&app, clip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn require_own_collection(collection_id: Id, caller: Id) -> Result<(), ApiError> {
    if collection_id != caller {
        return Err(ApiError::not_found("collection not found"));
    }
    Ok(())
}
