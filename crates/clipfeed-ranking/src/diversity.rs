use std::collections::HashMap;

use crate::candidate::Candidate;

/// Stage D (§4.7): greedy MMR-style rerank. Disabled when `diversity_mix`
/// is 0 (the caller is expected to skip calling this in that case, but a
/// 0 mix degenerates to decays of 1.0 so it's harmless to call anyway).
pub fn rerank_for_diversity(mut pool: Vec<Candidate>, diversity_mix: f64, target_size: usize) -> Vec<Candidate> {
    let topic_decay = 1.0 - diversity_mix * 0.4;
    let channel_decay = 1.0 - diversity_mix * 0.5;
    let platform_decay = 1.0 - diversity_mix * 0.16;

    let mut seen_topics: HashMap<clipfeed_models::Id, u32> = HashMap::new();
    let mut seen_channels: HashMap<String, u32> = HashMap::new();
    let mut seen_platforms: HashMap<String, u32> = HashMap::new();

    let mut output = Vec::with_capacity(target_size.min(pool.len()));

    while output.len() < target_size && !pool.is_empty() {
        let mut best_index = 0;
        let mut best_final = f64::NEG_INFINITY;

        for (index, candidate) in pool.iter().enumerate() {
            let topic_penalty: f64 = candidate
                .topic_ids
                .iter()
                .map(|id| topic_decay.powi(*seen_topics.get(id).unwrap_or(&0) as i32))
                .product();
            let channel_penalty = candidate
                .channel_name
                .as_deref()
                .map(|c| channel_decay.powi(*seen_channels.get(c).unwrap_or(&0) as i32))
                .unwrap_or(1.0);
            let platform_penalty = candidate
                .platform
                .as_deref()
                .map(|p| platform_decay.powi(*seen_platforms.get(p).unwrap_or(&0) as i32))
                .unwrap_or(1.0);

            let final_score = candidate.score * topic_penalty * channel_penalty * platform_penalty;
            if final_score > best_final {
                best_final = final_score;
                best_index = index;
            }
        }

        let mut chosen = pool.remove(best_index);
        chosen.div_score = best_final;

        for topic_id in &chosen.topic_ids {
            *seen_topics.entry(*topic_id).or_insert(0) += 1;
        }
        if let Some(channel) = chosen.channel_name.clone() {
            *seen_channels.entry(channel).or_insert(0) += 1;
        }
        if let Some(platform) = chosen.platform.clone() {
            *seen_platforms.entry(platform).or_insert(0) += 1;
        }

        output.push(chosen);
    }

    output
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_models::Id;

    fn candidate(id: Id, score: f64, topics: Vec<Id>, channel: Option<&str>) -> Candidate {
        Candidate {
            id,
            source_id: None,
            title: "t".into(),
            duration_seconds: 30.0,
            thumbnail_key: None,
            content_score: score,
            topic_ids: topics,
            channel_name: channel.map(str::to_string),
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
    fn zero_diversity_mix_preserves_score_order() {
        let cooking = Id::new();
        let a = candidate(Id::new(), 0.9, vec![cooking], Some("chan"));
        let b = candidate(Id::new(), 0.5, vec![cooking], Some("chan"));

        let ranked = rerank_for_diversity(vec![b.clone(), a.clone()], 0.0, 2);
        assert_eq!(ranked[0].id, a.id);
        assert_eq!(ranked[1].id, b.id);
    }

    #[test]
    fn repeated_channel_is_penalized_enough_to_reorder() {
        let chan_a_1 = candidate(Id::new(), 1.0, vec![], Some("a"));
        let chan_a_2 = candidate(Id::new(), 0.99, vec![], Some("a"));
        let chan_b = candidate(Id::new(), 0.9, vec![], Some("b"));

        let ranked = rerank_for_diversity(vec![chan_a_1.clone(), chan_a_2.clone(), chan_b.clone()], 1.0, 3);

        // First pick is the top scorer; the second pick should favor the
        // un-seen channel over the near-tied same-channel clip once the
        // channel decay (1 - 1.0*0.5 = 0.5) applies.
        assert_eq!(ranked[0].id, chan_a_1.id);
        assert_eq!(ranked[1].id, chan_b.id);
    }

    #[test]
    fn stops_at_target_size_even_with_a_larger_pool() {
        let pool = vec![
            candidate(Id::new(), 0.9, vec![], None),
            candidate(Id::new(), 0.8, vec![], None),
            candidate(Id::new(), 0.7, vec![], None),
        ];
        let ranked = rerank_for_diversity(pool, 0.3, 2);
        assert_eq!(ranked.len(), 2);
    }
}
