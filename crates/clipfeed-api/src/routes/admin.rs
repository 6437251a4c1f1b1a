//! The single-operator admin surface (§6): no `admins` table, a
//! configured username/password pair exchanged for an admin-claimed
//! bearer token, the same as the teacher's `control-plane-api` takes its
//! root credential from configuration rather than the database it
//! protects.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::AdminUser;
use crate::state::App;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
}

pub async fn login(
    State(app): State<Arc<App>>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    let username_ok = crate::auth::verify_worker_secret(&app.config.admin_username, &req.username);
    let password_ok = crate::auth::verify_worker_secret(&app.config.admin_password, &req.password);
    if !username_ok || !password_ok {
        return Err(ApiError::unauthorized("invalid admin credentials"));
    }

    let token = crate::auth::issue_token(&app.config.token_secret, clipfeed_models::Id::new(), true);
    Ok(Json(AdminLoginResponse { token }))
}

#[derive(Debug, Serialize)]
pub struct AdminStatus {
    pub users: i64,
    pub clips_ready: i64,
    pub jobs_queued: i64,
    pub jobs_running: i64,
    pub scout_candidates_pending: i64,
}

pub async fn status(State(app): State<Arc<App>>, AdminUser(_): AdminUser) -> Result<Json<AdminStatus>, ApiError> {
    let users: i64 =
        sqlx::query_scalar(app.handle.query("SELECT COUNT(*) FROM users").as_str()).fetch_one(app.handle.pool()).await?;
    let clips_ready: i64 = sqlx::query_scalar(app.handle.query("SELECT COUNT(*) FROM clips WHERE status = 'ready'").as_str())
        .fetch_one(app.handle.pool())
        .await?;
    let jobs_queued: i64 = sqlx::query_scalar(app.handle.query("SELECT COUNT(*) FROM jobs WHERE status = 'queued'").as_str())
        .fetch_one(app.handle.pool())
        .await?;
    let jobs_running: i64 = sqlx::query_scalar(app.handle.query("SELECT COUNT(*) FROM jobs WHERE status = 'running'").as_str())
        .fetch_one(app.handle.pool())
        .await?;
    let scout_candidates_pending: i64 = sqlx::query_scalar(
        app.handle.query("SELECT COUNT(*) FROM scout_candidates WHERE status = 'pending'").as_str(),
    )
    .fetch_one(app.handle.pool())
    .await?;

    Ok(Json(AdminStatus { users, clips_ready, jobs_queued, jobs_running, scout_candidates_pending }))
}
