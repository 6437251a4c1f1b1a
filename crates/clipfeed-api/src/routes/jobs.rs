//! Job listing and lifecycle transitions scoped to the submitting user
//! (§4.4, §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use clipfeed_models::{Id, Job};
use sqlx::Row;

use crate::error::ApiError;
use crate::routes::AuthUser;
use crate::state::App;

pub async fn list_jobs(State(app): State<Arc<App>>, AuthUser(user_id): AuthUser) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(clipfeed_queue::list_for_owner(&app.handle, user_id).await?))
}

pub async fn get_job(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Id>,
) -> Result<Json<Job>, ApiError> {
    let job = clipfeed_queue::get(&app.handle, job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;
    verify_owner(&app, job.source_id, user_id).await?;
    Ok(Json(job))
}

pub async fn dismiss_job(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    clipfeed_queue::dismiss(&app.handle, job_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_job(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Id>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(clipfeed_queue::cancel(&app.handle, job_id, user_id).await?))
}

pub async fn retry_job(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Id>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(clipfeed_queue::retry(&app.handle, job_id, user_id).await?))
}

/// `clipfeed_queue::get` performs no ownership scoping (it's also used
/// internally by the worker-facing routes); the HTTP-facing read enforces
/// it here, answering a mismatch as 404 rather than 403 (§7).
async fn verify_owner(app: &App, source_id: Id, caller: Id) -> Result<(), ApiError> {
    let row = sqlx::query(app.handle.query("SELECT submitted_by FROM sources WHERE id = ?").as_str())
        .bind(source_id.to_string())
        .fetch_optional(app.handle.pool())
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    let submitted_by: String = row.try_get("submitted_by")?;
    if submitted_by.parse::<Id>()? != caller {
        return Err(ApiError::forbidden_as_not_found("job not found"));
    }
    Ok(())
}
