use clipfeed_models::Id;

/// A clip carried through the ranking pipeline (§4.7). The underscore-named
/// fields in the spec's wire format (`_source_id`, `_age_hours`, ...) map to
/// the plain fields here; [`crate::pipeline::strip_internal_fields`] is what
/// actually drops them before a candidate is serialized to a client.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub id: Id,
    pub source_id: Option<Id>,
    pub title: String,
    pub duration_seconds: f64,
    pub thumbnail_key: Option<String>,
    pub content_score: f64,
    pub topic_ids: Vec<Id>,
    pub channel_name: Option<String>,
    pub platform: Option<String>,
    pub transcript_length: i64,
    pub file_size_bytes: i64,
    pub age_hours: f64,
    pub text_embedding: Option<Vec<u8>>,
    pub visual_embedding: Option<Vec<u8>>,
    /// Stage B's learning-to-rank (or topic-boost fallback) score.
    pub l2r_score: f64,
    /// The running score threaded through stages C and D.
    pub score: f64,
    /// Stage D's post-diversity-penalty score, kept for debugging/tests.
    pub div_score: f64,
}

impl Candidate {
    /// §4.7's 13-feature vector, in the order the LTR model expects it.
    pub fn feature_vector(&self, topic_overlap: i64, channel_affinity: f64, stats: &UserStats) -> [f64; 13] {
        [
            self.content_score,
            self.duration_seconds,
            self.topic_ids.len() as f64,
            self.transcript_length as f64,
            self.age_hours,
            self.file_size_bytes as f64,
            topic_overlap as f64,
            channel_affinity,
            stats.total_views as f64,
            stats.avg_watch_percentage,
            stats.like_rate,
            stats.save_rate,
            stats.hours_since_last_session,
        ]
    }
}

/// Per-user aggregates folded from `interactions`, feeding features 9-13 of
/// the LTR vector (§4.7). Computed once per feed request, not per candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct UserStats {
    pub total_views: i64,
    pub avg_watch_percentage: f64,
    pub like_rate: f64,
    pub save_rate: f64,
    /// Hours since the user's most recent interaction; 168 (one week) when
    /// the user has none yet (§4.7).
    pub hours_since_last_session: f64,
}

impl UserStats {
    pub const DEFAULT_HOURS_SINCE_LAST_SESSION: f64 = 168.0;

    pub fn empty() -> Self {
        Self {
            total_views: 0,
            avg_watch_percentage: 0.0,
            like_rate: 0.0,
            save_rate: 0.0,
            hours_since_last_session: Self::DEFAULT_HOURS_SINCE_LAST_SESSION,
        }
    }
}
