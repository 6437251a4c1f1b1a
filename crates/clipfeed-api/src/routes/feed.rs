//! The personalized feed, §4.7's five-stage pipeline assembled end to end:
//! recall, score, trend-boost, diversity rerank, finalize.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::Json;
use clipfeed_models::{Id, UserPreferences};
use clipfeed_ranking::{
    apply_trending_boost, load_channel_affinities, load_user_stats, load_user_topic_affinities, load_velocity,
    recall_candidates, recall_with_filter, rerank_for_diversity, score_candidates, FeedItem, RecallParams,
    SavedFilterRecallParams, ThumbnailSigner, UserStats, DEFAULT_PAGE_LIMIT,
};
use serde::Deserialize;
use sqlx::Row;

use crate::error::ApiError;
use crate::routes::OptionalAuthUser;
use crate::state::App;

/// Signs thumbnail keys through the configured object store. Shared with
/// `routes::search`, which ranks over a different recall path but finalizes
/// through the same signer.
pub(crate) struct StorageThumbnailSigner<'a>(pub(crate) &'a dyn crate::storage::ObjectStore);

impl ThumbnailSigner for StorageThumbnailSigner<'_> {
    fn sign(&self, thumbnail_key: &str) -> String {
        self.0.presign_get(thumbnail_key, Duration::from_secs(3600))
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub page_size: Option<usize>,
    pub filter: Option<Id>,
}

pub async fn get_feed(
    State(app): State<Arc<App>>,
    OptionalAuthUser(user_id): OptionalAuthUser,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedItem>>, ApiError> {
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, 100);
    let prefs = load_preferences(&app, user_id).await?;
    let snapshot = app.topics.load().await;

    let mut candidates = match query.filter {
        Some(filter_id) => {
            let Some(user_id) = user_id else {
                return Err(ApiError::unauthorized("a saved filter requires an authenticated caller"));
            };
            let body = load_saved_filter_body(&app, filter_id, user_id).await?;
            let params = SavedFilterRecallParams {
                filter: &body,
                user_id,
                exploration_rate: prefs.exploration_rate,
                half_life_hours: prefs.recency_half_life_hours(),
                page_size,
            };
            recall_with_filter(&app.handle, &params, &snapshot).await?
        }
        None => {
            let params = RecallParams {
                page_size,
                authenticated_user: user_id,
                min_clip_seconds: prefs.min_clip_seconds,
                max_clip_seconds: prefs.max_clip_seconds,
                exploration_rate: prefs.exploration_rate,
                half_life_hours: prefs.recency_half_life_hours(),
                dedupe_seen_24h: prefs.dedupe_seen_24h,
            };
            recall_candidates(&app.handle, &params).await?
        }
    };

    let (user_affinities, channel_affinities, stats) = match user_id {
        Some(user_id) => (
            load_user_topic_affinities(&app.handle, user_id).await?,
            load_channel_affinities(&app.handle, user_id).await?,
            load_user_stats(&app.handle, user_id).await?,
        ),
        None => (HashMap::new(), HashMap::new(), UserStats::empty()),
    };

    candidates = score_candidates(
        candidates,
        app.ltr_model.as_ref(),
        &user_affinities,
        None,
        &snapshot,
        &channel_affinities,
        &stats,
    );

    if prefs.trending_boost {
        let ids: Vec<Id> = candidates.iter().map(|c| c.id).collect();
        let velocity = load_velocity(&app.handle, &ids).await?;
        apply_trending_boost(&mut candidates, &velocity);
    }

    let candidates = rerank_for_diversity(candidates, prefs.diversity_mix, page_size);
    let signer = StorageThumbnailSigner(app.storage.as_ref());
    Ok(Json(clipfeed_ranking::finalize(candidates, page_size, &signer)))
}

async fn load_preferences(app: &App, user_id: Option<Id>) -> Result<UserPreferences, ApiError> {
    let Some(user_id) = user_id else {
        return Ok(UserPreferences::defaults_for(Id::new()));
    };

    let row = sqlx::query(
        app.handle
            .query(
                "SELECT exploration_rate, diversity_mix, freshness_bias, trending_boost, dedupe_seen_24h, \
                 min_clip_seconds, max_clip_seconds, topic_weights, scout_threshold, scout_auto_ingest \
                 FROM user_preferences WHERE user_id = ?",
            )
            .as_str(),
    )
    .bind(user_id.to_string())
    .fetch_optional(app.handle.pool())
    .await?;

    let Some(row) = row else {
        return Ok(UserPreferences::defaults_for(user_id));
    };

    let topic_weights_json: String = row.try_get("topic_weights")?;
    Ok(UserPreferences {
        user_id,
        exploration_rate: row.try_get("exploration_rate")?,
        diversity_mix: row.try_get("diversity_mix")?,
        freshness_bias: row.try_get("freshness_bias")?,
        trending_boost: row.try_get::<i64, _>("trending_boost")? != 0,
        dedupe_seen_24h: row.try_get::<i64, _>("dedupe_seen_24h")? != 0,
        min_clip_seconds: row.try_get("min_clip_seconds")?,
        max_clip_seconds: row.try_get("max_clip_seconds")?,
        topic_weights: serde_json::from_str(&topic_weights_json)?,
        scout_threshold: row.try_get("scout_threshold")?,
        scout_auto_ingest: row.try_get::<i64, _>("scout_auto_ingest")? != 0,
    })
}

pub(crate) async fn load_saved_filter_body(
    app: &App,
    filter_id: Id,
    caller: Id,
) -> Result<clipfeed_models::SavedFilterBody, ApiError> {
    let row = sqlx::query(app.handle.query("SELECT user_id, body FROM saved_filters WHERE id = ?").as_str())
        .bind(filter_id.to_string())
        .fetch_optional(app.handle.pool())
        .await?
        .ok_or_else(|| ApiError::not_found("saved filter not found"))?;

    let owner: String = row.try_get("user_id")?;
    if owner.parse::<Id>()? != caller {
        return Err(ApiError::forbidden_as_not_found("saved filter not found"));
    }

    let body_json: String = row.try_get("body")?;
    Ok(serde_json::from_str(&body_json)?)
}
