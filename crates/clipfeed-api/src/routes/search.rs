//! Full-text clip search (§4.10), finalized through the same thumbnail
//! signer the feed uses.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use clipfeed_ranking::{search_clips, FeedItem, DEFAULT_PAGE_LIMIT};
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::feed::StorageThumbnailSigner;
use crate::state::App;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

pub async fn search(
    State(app): State<Arc<App>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FeedItem>>, ApiError> {
    if query.q.trim().is_empty() {
        return Err(ApiError::bad_request("q must not be empty"));
    }
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, 100);

    let candidates = search_clips(&app.handle, &query.q, limit).await?;
    let signer = StorageThumbnailSigner(app.storage.as_ref());
    Ok(Json(clipfeed_ranking::finalize(candidates, limit, &signer)))
}
