//! Direct URL submission (§4.5, §6).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use clipfeed_models::{Job, Source};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::routes::AuthUser;
use crate::state::App;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[validate(url)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub source: Source,
    pub job: Job,
}

pub async fn submit(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(req): ValidatedJson<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let (source, job) = clipfeed_ingest::submit_url(&app.handle, user_id, &req.url).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { source, job })))
}
