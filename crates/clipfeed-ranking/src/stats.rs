use std::collections::HashMap;

use clipfeed_dialect::DialectHandle;
use clipfeed_models::Id;
use sqlx::Row;

use crate::candidate::UserStats;
use crate::Error;

/// High/very-low watch-completion thresholds used by [`score_interaction`]
/// (§4.7's channel-affinity feature; the spec names the bands but not the
/// cutoffs, resolved here — see `DESIGN.md`).
const HIGH_COMPLETION_THRESHOLD: f64 = 0.9;
const VERY_LOW_COMPLETION_THRESHOLD: f64 = 0.1;

/// Loads the per-user aggregates feeding features 9-12 of the LTR vector
/// (§4.7): total views, average watch completion, like rate, save rate,
/// and hours since the most recent interaction.
pub async fn load_user_stats(handle: &DialectHandle, user_id: Id) -> Result<UserStats, Error> {
    let row = sqlx::query(
        handle
            .query(
                "SELECT \
                    SUM(CASE WHEN action = 'view' THEN 1 ELSE 0 END) as total_views, \
                    COUNT(*) as total_interactions, \
                    AVG(watch_percentage) as avg_pct, \
                    SUM(CASE WHEN action = 'like' THEN 1 ELSE 0 END) as likes, \
                    SUM(CASE WHEN action = 'save' THEN 1 ELSE 0 END) as saves, \
                    MAX(created_at) as last_at \
                 FROM interactions WHERE user_id = ?",
            )
            .as_str(),
    )
    .bind(user_id.to_string())
    .fetch_one(handle.pool())
    .await?;

    let total_views: Option<i64> = row.try_get("total_views")?;
    let total_interactions: i64 = row.try_get("total_interactions")?;
    let avg_pct: Option<f64> = row.try_get("avg_pct")?;
    let likes: Option<i64> = row.try_get("likes")?;
    let saves: Option<i64> = row.try_get("saves")?;
    let last_at: Option<String> = row.try_get("last_at")?;

    let hours_since_last_session = match last_at {
        Some(ts) => parse_timestamp(&ts)
            .map(|last| (chrono::Utc::now() - last).num_seconds() as f64 / 3600.0)
            .unwrap_or(UserStats::DEFAULT_HOURS_SINCE_LAST_SESSION),
        None => UserStats::DEFAULT_HOURS_SINCE_LAST_SESSION,
    };

    let denom = total_interactions.max(0) as f64;
    let like_rate = if denom > 0.0 { likes.unwrap_or(0) as f64 / denom } else { 0.0 };
    let save_rate = if denom > 0.0 { saves.unwrap_or(0) as f64 / denom } else { 0.0 };

    Ok(UserStats {
        total_views: total_views.unwrap_or(0),
        avg_watch_percentage: avg_pct.unwrap_or(0.0),
        like_rate,
        save_rate,
        hours_since_last_session,
    })
}

/// Loads the per-channel affinity map (§4.7's `channel_affinity` feature):
/// every interaction the user has made against a clip is folded by the
/// clip's source channel into a signed score via [`score_interaction`].
pub async fn load_channel_affinities(
    handle: &DialectHandle,
    user_id: Id,
) -> Result<HashMap<String, f64>, Error> {
    let rows = sqlx::query(
        handle
            .query(
                "SELECT i.action, i.watch_percentage, s.channel_name \
                 FROM interactions i \
                 JOIN clips c ON c.id = i.clip_id \
                 LEFT JOIN sources s ON s.id = c.source_id \
                 WHERE i.user_id = ?",
            )
            .as_str(),
    )
    .bind(user_id.to_string())
    .fetch_all(handle.pool())
    .await?;

    let mut affinities: HashMap<String, f64> = HashMap::new();
    for row in &rows {
        let channel_name: Option<String> = row.try_get("channel_name")?;
        let Some(channel_name) = channel_name else {
            continue;
        };
        let action: String = row.try_get("action")?;
        let watch_percentage: Option<f64> = row.try_get("watch_percentage")?;
        *affinities.entry(channel_name).or_insert(0.0) += score_interaction(&action, watch_percentage);
    }

    Ok(affinities)
}

/// Scores a single interaction row toward a channel's affinity total
/// (§4.7): signed by action, with a watch-completion bonus/penalty band
/// for actions (like plain views) that carry a `watch_percentage` but
/// aren't already covered by an explicit positive/negative action.
fn score_interaction(action: &str, watch_percentage: Option<f64>) -> f64 {
    match action {
        "like" | "save" | "share" => 2.0,
        "watch_full" => 1.5,
        "dislike" | "skip" => -0.5,
        _ => match watch_percentage {
            Some(p) if p >= HIGH_COMPLETION_THRESHOLD => 1.0 + p,
            Some(p) if p < VERY_LOW_COMPLETION_THRESHOLD => -0.3,
            _ => 0.5,
        },
    }
}

/// Loads the user's per-topic affinity weights (`user_topic_affinities`),
/// the map [`clipfeed_topics::compute_boost`] walks against the topic
/// graph. A small, direct companion to [`load_channel_affinities`] above.
pub async fn load_user_topic_affinities(handle: &DialectHandle, user_id: Id) -> Result<HashMap<Id, f64>, Error> {
    let rows = sqlx::query(
        handle
            .query("SELECT topic_id, weight FROM user_topic_affinities WHERE user_id = ?")
            .as_str(),
    )
    .bind(user_id.to_string())
    .fetch_all(handle.pool())
    .await?;

    let mut affinities = HashMap::new();
    for row in &rows {
        let topic_id: String = row.try_get("topic_id")?;
        let topic_id = topic_id
            .parse::<Id>()
            .map_err(|err| Error::MalformedRow(format!("invalid id {topic_id:?}: {err}")))?;
        let weight: f64 = row.try_get("weight")?;
        affinities.insert(topic_id, weight);
    }

    Ok(affinities)
}

fn parse_timestamp(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}
