//! Account registration and login (§6). Grounded on `clipfeed_api::auth`'s
//! password hashing and token issuance.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use clipfeed_models::Id;
use serde::{Deserialize, Serialize};
use sqlx::error::DatabaseError;
use sqlx::Row;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::state::App;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: Id,
}

pub async fn register(
    State(app): State<Arc<App>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let dialect = app.handle.dialect();
    let user_id = Id::new();
    let password_hash = crate::auth::hash_password(&req.password);

    let sql = dialect.rewrite("INSERT INTO users (id, username, email, password_hash) VALUES (?, ?, ?, ?)");
    sqlx::query(&sql)
        .bind(user_id.to_string())
        .bind(&req.username)
        .bind(&req.email)
        .bind(&password_hash)
        .execute(app.handle.pool())
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::conflict("username or email already taken")
            }
            _ => err.into(),
        })?;

    let sql = dialect.rewrite("INSERT INTO user_preferences (user_id) VALUES (?)");
    sqlx::query(&sql).bind(user_id.to_string()).execute(app.handle.pool()).await?;

    let token = crate::auth::issue_token(&app.config.token_secret, user_id, false);
    Ok(Json(AuthResponse { token, user_id }))
}

pub async fn login(
    State(app): State<Arc<App>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let dialect = app.handle.dialect();
    let sql = dialect.rewrite("SELECT id, password_hash FROM users WHERE username = ?");
    let row = sqlx::query(&sql)
        .bind(&req.username)
        .fetch_optional(app.handle.pool())
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid username or password"))?;

    let password_hash: String = row.try_get("password_hash")?;
    if !crate::auth::verify_password(&req.password, &password_hash) {
        return Err(ApiError::unauthorized("invalid username or password"));
    }

    let user_id: Id = row.try_get::<String, _>("id")?.parse()?;
    let token = crate::auth::issue_token(&app.config.token_secret, user_id, false);
    Ok(Json(AuthResponse { token, user_id }))
}
