use std::collections::HashMap;

use clipfeed_dialect::DialectHandle;
use clipfeed_models::Id;
use sqlx::Row;

use crate::candidate::Candidate;
use crate::Error;

/// Stage C (§4.7): multiplies each candidate's score by
/// `1 + log1p(velocity) * 0.1`, where `velocity` is the count of
/// interactions against that clip over the last 6 hours. A no-op for
/// clips absent from the velocity map (velocity 0 -> multiplier 1.0).
pub fn apply_trending_boost(candidates: &mut [Candidate], velocity: &HashMap<Id, f64>) {
    for candidate in candidates.iter_mut() {
        let v = velocity.get(&candidate.id).copied().unwrap_or(0.0);
        candidate.score *= 1.0 + v.ln_1p() * 0.1;
    }
}

/// Loads interaction counts per clip over the last 6 hours (§4.7's
/// "velocity"), scoped to the candidate set so the query stays bounded.
pub async fn load_velocity(handle: &DialectHandle, clip_ids: &[Id]) -> Result<HashMap<Id, f64>, Error> {
    let mut velocity = HashMap::new();
    if clip_ids.is_empty() {
        return Ok(velocity);
    }

    let placeholders = std::iter::repeat("?")
        .take(clip_ids.len())
        .collect::<Vec<_>>()
        .join(", ");
    let age_expr = handle.dialect().age_hours_expr("created_at");
    let sql = format!(
        "SELECT clip_id, COUNT(*) as n FROM interactions \
         WHERE clip_id IN ({placeholders}) AND ({age_expr}) < 6.0 GROUP BY clip_id"
    );

    let mut query = sqlx::query(handle.query(&sql).as_str());
    for id in clip_ids {
        query = query.bind(id.to_string());
    }

    let rows = query.fetch_all(handle.pool()).await?;
    for row in &rows {
        let clip_id: String = row.try_get("clip_id")?;
        let clip_id = clip_id
            .parse::<Id>()
            .map_err(|err| Error::MalformedRow(format!("invalid id {clip_id:?}: {err}")))?;
        let n: i64 = row.try_get("n")?;
        velocity.insert(clip_id, n as f64);
    }

    Ok(velocity)
}

#[cfg(test)]
mod test {
    use super::*;

    fn candidate(id: Id, score: f64) -> Candidate {
        Candidate {
            id,
            source_id: None,
            title: "t".into(),
            duration_seconds: 30.0,
            thumbnail_key: None,
            content_score: score,
            topic_ids: vec![],
            channel_name: None,
            platform: None,
            transcript_length: 0,
            file_size_bytes: 0,
            age_hours: 1.0,
            text_embedding: None,
            visual_embedding: None,
            l2r_score: score,
            score,
            div_score: 0.0,
        }
    }

    #[test]
    fn zero_velocity_does_not_change_score() {
        let id = Id::new();
        let mut candidates = vec![candidate(id, 1.0)];
        apply_trending_boost(&mut candidates, &HashMap::new());
        assert_eq!(candidates[0].score, 1.0);
    }

    #[test]
    fn positive_velocity_boosts_score() {
        let id = Id::new();
        let mut candidates = vec![candidate(id, 1.0)];
        let velocity = HashMap::from([(id, 10.0)]);
        apply_trending_boost(&mut candidates, &velocity);
        assert!((candidates[0].score - (1.0 + 10f64.ln_1p() * 0.1)).abs() < 1e-9);
    }
}
