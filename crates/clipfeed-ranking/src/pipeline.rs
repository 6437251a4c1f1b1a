use clipfeed_models::Id;
use serde::Serialize;

use crate::candidate::Candidate;

/// Mints a presigned URL for an object-store key. Object storage is an
/// external collaborator (§1); this is the seam the HTTP layer's real
/// implementation plugs into.
pub trait ThumbnailSigner: Send + Sync {
    fn sign(&self, thumbnail_key: &str) -> String;
}

/// A no-op signer for tests and environments without object storage
/// configured: passes the key through unchanged.
pub struct PassthroughSigner;

impl ThumbnailSigner for PassthroughSigner {
    fn sign(&self, thumbnail_key: &str) -> String {
        thumbnail_key.to_string()
    }
}

/// The public, wire-facing shape of a ranked clip. Every underscore-
/// prefixed internal field the spec names (`_source_id`, `_age_hours`,
/// `_l2r_score`, `_score`, `_transcript_length`, `_file_size_bytes`,
/// `_div_score`) is simply absent here rather than stripped at
/// serialization time (§4.7 Stage E).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeedItem {
    pub id: Id,
    pub title: String,
    pub duration_seconds: f64,
    pub content_score: f64,
    pub topic_ids: Vec<Id>,
    pub channel_name: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Stage E (§4.7): trims the ranked pool to the requested limit and
/// enriches each survivor with a presigned thumbnail URL.
pub fn finalize(candidates: Vec<Candidate>, limit: usize, signer: &dyn ThumbnailSigner) -> Vec<FeedItem> {
    candidates
        .into_iter()
        .take(limit)
        .map(|candidate| FeedItem {
            id: candidate.id,
            title: candidate.title,
            duration_seconds: candidate.duration_seconds,
            content_score: candidate.content_score,
            topic_ids: candidate.topic_ids,
            channel_name: candidate.channel_name,
            thumbnail_url: candidate.thumbnail_key.map(|key| signer.sign(&key)),
        })
        .collect()
}

/// Default page size when the caller doesn't specify one (§4.7 Stage E).
pub const DEFAULT_PAGE_LIMIT: usize = 20;

#[cfg(test)]
mod test {
    use super::*;

    fn candidate(id: Id) -> Candidate {
        Candidate {
            id,
            source_id: Some(Id::new()),
            title: "t".into(),
            duration_seconds: 30.0,
            thumbnail_key: Some("thumbs/abc.jpg".into()),
            content_score: 0.5,
            topic_ids: vec![],
            channel_name: Some("chan".into()),
            platform: Some("youtube".into()),
            transcript_length: 10,
            file_size_bytes: 1000,
            age_hours: 3.0,
            text_embedding: None,
            visual_embedding: None,
            l2r_score: 1.0,
            score: 1.0,
            div_score: 1.0,
        }
    }

    #[test]
    fn trims_to_the_requested_limit() {
        let candidates = vec![candidate(Id::new()), candidate(Id::new()), candidate(Id::new())];
        let items = finalize(candidates, 2, &PassthroughSigner);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn enriches_with_a_signed_thumbnail_url() {
        let items = finalize(vec![candidate(Id::new())], 10, &PassthroughSigner);
        assert_eq!(items[0].thumbnail_url.as_deref(), Some("thumbs/abc.jpg"));
    }

    #[test]
    fn missing_thumbnail_key_yields_no_url() {
        let mut c = candidate(Id::new());
        c.thumbnail_key = None;
        let items = finalize(vec![c], 10, &PassthroughSigner);
        assert_eq!(items[0].thumbnail_url, None);
    }
}
