//! Encrypted platform-credential storage for the scout/ingest pipeline
//! (§4.12, §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use clipfeed_models::CookiePlatform;
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::routes::AuthUser;
use crate::state::App;

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertCookieRequest {
    #[validate(length(min = 1))]
    pub value: String,
}

pub async fn upsert_cookie(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(platform): Path<String>,
    ValidatedJson(req): ValidatedJson<UpsertCookieRequest>,
) -> Result<StatusCode, ApiError> {
    let platform = parse_platform(&platform)?;
    let encrypted = app.cookie_vault.encrypt(&req.value);
    clipfeed_security::upsert(&app.handle, user_id, platform, &encrypted).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_cookie(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(platform): Path<String>,
) -> Result<StatusCode, ApiError> {
    let platform = parse_platform(&platform)?;
    clipfeed_security::delete(&app.handle, user_id, platform).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_platform(raw: &str) -> Result<CookiePlatform, ApiError> {
    CookiePlatform::from_db_str(raw).ok_or_else(|| ApiError::bad_request(format!("unknown platform {raw:?}")))
}
