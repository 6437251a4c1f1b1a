use std::collections::HashMap;

use clipfeed_dialect::DialectHandle;
use clipfeed_models::Id;
use sqlx::Row;

use crate::create::parse_id;
use crate::Error;

const POSITIVE_ACTIONS: &str = "('like', 'save', 'share', 'watch_full')";

/// Per-user scout profile (§4.9): top topics, favorite channels, candidate
/// counts by status, and the caller's own scout settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoutProfile {
    pub top_topics: Vec<(Id, f64)>,
    pub favorite_channels: Vec<(String, i64)>,
    pub pending_candidates: i64,
    pub ingested_candidates: i64,
    pub rejected_candidates: i64,
    pub scout_threshold: f64,
    pub scout_auto_ingest: bool,
}

/// Loads the scout profile for `user_id`. Top topics are computed from
/// positive interactions joined to `clip_topics`, weighted by the user's
/// explicit `user_topic_affinities` entry when one exists. A topic the
/// user has never explicitly weighted is treated as neutral (weight
/// `1.0`, not `0.0`) — otherwise a brand-new user's raw interaction
/// signal would always be multiplied away.
pub async fn load_scout_profile(handle: &DialectHandle, user_id: Id) -> Result<ScoutProfile, Error> {
    let dialect = handle.dialect();

    let affinities: HashMap<Id, f64> = {
        let sql = dialect.rewrite("SELECT topic_id, weight FROM user_topic_affinities WHERE user_id = ?");
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(handle.pool())
            .await?;
        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let topic_id: String = row.try_get("topic_id")?;
            let weight: f64 = row.try_get("weight")?;
            map.insert(parse_id(&topic_id)?, weight);
        }
        map
    };

    let mut top_topics: Vec<(Id, f64)> = {
        let sql = dialect.rewrite(&format!(
            "SELECT ct.topic_id as topic_id, SUM(ct.confidence) as raw_score \
             FROM interactions i \
             JOIN clip_topics ct ON ct.clip_id = i.clip_id \
             WHERE i.user_id = ? AND i.action IN {POSITIVE_ACTIONS} \
             GROUP BY ct.topic_id"
        ));
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(handle.pool())
            .await?;
        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            let topic_id: String = row.try_get("topic_id")?;
            let raw_score: f64 = row.try_get("raw_score")?;
            let topic_id = parse_id(&topic_id)?;
            let weight = affinities.get(&topic_id).copied().unwrap_or(1.0);
            topics.push((topic_id, raw_score * weight));
        }
        topics
    };
    top_topics.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let favorite_channels: Vec<(String, i64)> = {
        let sql = dialect.rewrite(&format!(
            "SELECT s.channel_name as channel_name, COUNT(*) as n \
             FROM interactions i \
             JOIN clips c ON c.id = i.clip_id \
             JOIN sources s ON s.id = c.source_id \
             WHERE i.user_id = ? AND i.action IN {POSITIVE_ACTIONS} AND s.channel_name IS NOT NULL \
             GROUP BY s.channel_name \
             ORDER BY n DESC"
        ));
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(handle.pool())
            .await?;
        rows.into_iter()
            .map(|row| Ok::<_, Error>((row.try_get("channel_name")?, row.try_get("n")?)))
            .collect::<Result<_, _>>()?
    };

    let (pending, ingested, rejected) = {
        let sql = dialect.rewrite(
            "SELECT c.status as status, COUNT(*) as n \
             FROM scout_candidates c \
             JOIN scout_sources s ON s.id = c.scout_source_id \
             WHERE s.owner_id = ? \
             GROUP BY c.status",
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(handle.pool())
            .await?;

        let mut pending = 0i64;
        let mut ingested = 0i64;
        let mut rejected = 0i64;
        for row in rows {
            let status: String = row.try_get("status")?;
            let n: i64 = row.try_get("n")?;
            match status.as_str() {
                "pending" => pending = n,
                "ingested" => ingested = n,
                "rejected" => rejected = n,
                _ => {}
            }
        }
        (pending, ingested, rejected)
    };

    let (scout_threshold, scout_auto_ingest) = {
        let sql = dialect.rewrite("SELECT scout_threshold, scout_auto_ingest FROM user_preferences WHERE user_id = ?");
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_optional(handle.pool())
            .await?;
        match row {
            Some(row) => {
                let threshold: f64 = row.try_get("scout_threshold")?;
                let auto_ingest: bool = row.try_get::<i64, _>("scout_auto_ingest")? != 0;
                (threshold, auto_ingest)
            }
            None => (0.6, false),
        }
    };

    Ok(ScoutProfile {
        top_topics,
        favorite_channels,
        pending_candidates: pending,
        ingested_candidates: ingested,
        rejected_candidates: rejected,
        scout_threshold,
        scout_auto_ingest,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_dialect::Dialect;
    use chrono::Utc;

    async fn seeded() -> (DialectHandle, Id) {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();

        let user = Id::new();
        let source = Id::new();
        let clip = Id::new();
        let topic = Id::new();
        let now = Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?,'a','a@example.com','h')")
            .bind(user.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO sources (id, url, platform, submitted_by, channel_name) VALUES (?, 'u', 'youtube', ?, 'My Channel')")
            .bind(source.to_string())
            .bind(user.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO clips (id, source_id, title, duration_seconds, start_time, end_time, storage_key, status) \
             VALUES (?, ?, 't', 10.0, 0.0, 10.0, 'k', 'ready')",
        )
        .bind(clip.to_string())
        .bind(source.to_string())
        .execute(handle.pool())
        .await
        .unwrap();
        sqlx::query("INSERT INTO topics (id, name, slug, path) VALUES (?, 'Cooking', 'cooking', 'cooking')")
            .bind(topic.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO clip_topics (clip_id, topic_id, confidence) VALUES (?, ?, 1.0)")
            .bind(clip.to_string())
            .bind(topic.to_string())
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO interactions (id, user_id, clip_id, action, created_at) VALUES (?, ?, ?, 'like', ?)")
            .bind(Id::new().to_string())
            .bind(user.to_string())
            .bind(clip.to_string())
            .bind(&now)
            .execute(handle.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO user_preferences (user_id) VALUES (?)")
            .bind(user.to_string())
            .execute(handle.pool())
            .await
            .unwrap();

        (handle, user)
    }

    #[tokio::test]
    async fn surfaces_a_topic_from_a_positive_interaction_with_no_explicit_affinity() {
        let (handle, user) = seeded().await;
        let profile = load_scout_profile(&handle, user).await.unwrap();
        assert_eq!(profile.top_topics.len(), 1);
        assert_eq!(profile.top_topics[0].1, 1.0);
    }

    #[tokio::test]
    async fn surfaces_the_favorite_channel() {
        let (handle, user) = seeded().await;
        let profile = load_scout_profile(&handle, user).await.unwrap();
        assert_eq!(profile.favorite_channels, vec![("My Channel".to_string(), 1)]);
    }

    #[tokio::test]
    async fn defaults_scout_settings_when_preferences_exist() {
        let (handle, user) = seeded().await;
        let profile = load_scout_profile(&handle, user).await.unwrap();
        assert_eq!(profile.scout_threshold, 0.6);
        assert!(!profile.scout_auto_ingest);
    }

    #[tokio::test]
    async fn user_with_no_activity_has_an_empty_profile() {
        let (handle, _user) = seeded().await;
        let other = Id::new();
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?,'b','b@example.com','h')")
            .bind(other.to_string())
            .execute(handle.pool())
            .await
            .unwrap();

        let profile = load_scout_profile(&handle, other).await.unwrap();
        assert!(profile.top_topics.is_empty());
        assert!(profile.favorite_channels.is_empty());
        assert_eq!(profile.pending_candidates, 0);
    }
}
