use crate::Id;
use std::collections::BTreeMap;

/// User is an account identity. It owns preferences, saved clips,
/// collections, affinities, and platform cookies (§3). Nothing in this
/// crate enforces the cascade-on-delete behavior described in the spec —
/// that's a property of the schema's foreign keys (see
/// `clipfeed-migrations`), not of this type.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// UserPreferences tunes every stage of the ranking pipeline (§4.7) and the
/// ingestion path (§4.9). All fractional knobs are expected (but not
/// enforced by this type) to lie in `[0, 1]`; callers validate at the HTTP
/// boundary.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserPreferences {
    pub user_id: Id,
    pub exploration_rate: f64,
    pub diversity_mix: f64,
    pub freshness_bias: f64,
    pub trending_boost: bool,
    pub dedupe_seen_24h: bool,
    pub min_clip_seconds: f64,
    pub max_clip_seconds: f64,
    pub topic_weights: BTreeMap<String, f64>,
    pub scout_threshold: f64,
    pub scout_auto_ingest: bool,
}

impl UserPreferences {
    pub fn defaults_for(user_id: Id) -> Self {
        Self {
            user_id,
            exploration_rate: 0.15,
            diversity_mix: 0.3,
            freshness_bias: 0.5,
            trending_boost: true,
            dedupe_seen_24h: true,
            min_clip_seconds: 5.0,
            max_clip_seconds: 180.0,
            topic_weights: BTreeMap::new(),
            scout_threshold: 0.6,
            scout_auto_ingest: false,
        }
    }

    /// The recency half-life in hours implied by `freshness_bias`, per
    /// §4.7 Stage A: `freshness=1 → 24h, freshness=0 → 672h`.
    pub fn recency_half_life_hours(&self) -> f64 {
        24.0 + (1.0 - self.freshness_bias.clamp(0.0, 1.0)) * 648.0
    }
}
