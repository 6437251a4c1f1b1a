use std::collections::HashMap;

use clipfeed_topics::TopicSnapshot;

use crate::candidate::{Candidate, UserStats};
use crate::ltr::LtrModel;
use crate::similarity::{blob_to_vec, cosine_similarity};

/// Stage B (§4.7): scores every candidate either with a loaded LTR model or
/// the topic-boost + cosine fallback, then stable-sorts by the resulting
/// score (ties broken by `content_score DESC` for the model path, since the
/// fallback's score already folds `content_score` in).
pub fn score_candidates(
    mut candidates: Vec<Candidate>,
    model: Option<&LtrModel>,
    user_affinities: &HashMap<clipfeed_models::Id, f64>,
    user_embedding: Option<&[f32]>,
    snapshot: &TopicSnapshot,
    channel_affinities: &HashMap<String, f64>,
    stats: &UserStats,
) -> Vec<Candidate> {
    for candidate in &mut candidates {
        let l2r_score = match model {
            Some(model) => {
                let topic_overlap = candidate
                    .topic_ids
                    .iter()
                    .filter(|id| user_affinities.contains_key(id))
                    .count() as i64;
                let channel_affinity = candidate
                    .channel_name
                    .as_deref()
                    .and_then(|name| channel_affinities.get(name))
                    .copied()
                    .unwrap_or(0.0);
                let features = candidate.feature_vector(topic_overlap, channel_affinity, stats);
                model.score(&features)
            }
            None => {
                let topic_boost = clipfeed_topics::compute_boost(&candidate.topic_ids, user_affinities, snapshot);
                let boost = candidate.content_score * topic_boost;
                let cos_sim = candidate
                    .text_embedding
                    .as_deref()
                    .and_then(blob_to_vec)
                    .zip(user_embedding.map(<[f32]>::to_vec))
                    .map(|(clip, user)| cosine_similarity(&clip, &user).max(0.0) as f64)
                    .unwrap_or(0.0);
                boost * 0.6 + cos_sim * 0.4
            }
        };

        candidate.l2r_score = l2r_score;
        candidate.score = l2r_score;
    }

    if model.is_some() {
        candidates.sort_by(|a, b| {
            b.l2r_score
                .partial_cmp(&a.l2r_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.content_score.partial_cmp(&a.content_score).unwrap_or(std::cmp::Ordering::Equal))
        });
    } else {
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    }

    candidates
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_models::Id;

    fn candidate(id: Id, content_score: f64) -> Candidate {
        Candidate {
            id,
            source_id: None,
            title: "t".into(),
            duration_seconds: 30.0,
            thumbnail_key: None,
            content_score,
            topic_ids: vec![],
            channel_name: None,
            platform: None,
            transcript_length: 0,
            file_size_bytes: 0,
            age_hours: 1.0,
            text_embedding: None,
            visual_embedding: None,
            l2r_score: 0.0,
            score: 0.0,
            div_score: 0.0,
        }
    }

    #[test]
    fn fallback_neutral_boost_keeps_content_score_ordering() {
        let a = candidate(Id::new(), 0.9);
        let b = candidate(Id::new(), 0.2);
        let snapshot = TopicSnapshot::default();
        let stats = UserStats::empty();

        let ranked = score_candidates(
            vec![b.clone(), a.clone()],
            None,
            &HashMap::new(),
            None,
            &snapshot,
            &HashMap::new(),
            &stats,
        );

        assert_eq!(ranked[0].id, a.id);
        assert_eq!(ranked[1].id, b.id);
    }
}
