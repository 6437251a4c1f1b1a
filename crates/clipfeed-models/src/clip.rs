use crate::Id;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipStatus {
    Processing,
    Ready,
    Failed,
    Expired,
    Evicted,
}

impl ClipStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Evicted => "evicted",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Some(match s {
            "processing" => Self::Processing,
            "ready" => Self::Ready,
            "failed" => Self::Failed,
            "expired" => Self::Expired,
            "evicted" => Self::Evicted,
            _ => return None,
        })
    }
}

/// Clip is a playable segment derived from a [`crate::Source`] (§3).
///
/// Invariants enforced by the application layer (not by this type):
/// a `Ready` clip must have a non-empty `storage_key`; `is_protected`
/// tracks the cardinality of active saves and must never be cleared while
/// any save exists; the lifecycle sweeper (C11) must never expire or evict
/// a protected clip.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Clip {
    pub id: Id,
    pub source_id: Option<Id>,
    pub title: String,
    pub duration_seconds: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub storage_key: String,
    pub thumbnail_key: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size_bytes: i64,
    pub transcript: Option<String>,
    pub topics: Vec<String>,
    pub tags: Vec<String>,
    pub content_score: f64,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_protected: bool,
    pub status: ClipStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Clip {
    /// §3 invariant: a ready clip must carry a non-empty storage key.
    pub fn is_valid_ready(&self) -> bool {
        self.status != ClipStatus::Ready || !self.storage_key.is_empty()
    }
}

/// ClipEmbedding stores opaque little-endian float32 vectors (§3, §4.8).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipEmbedding {
    pub clip_id: Id,
    pub text_embedding: Option<Vec<u8>>,
    pub visual_embedding: Option<Vec<u8>>,
    pub model_version: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionAction {
    View,
    Like,
    Dislike,
    Save,
    Share,
    Skip,
    WatchFull,
}

impl InteractionAction {
    pub const ALL: [InteractionAction; 7] = [
        InteractionAction::View,
        InteractionAction::Like,
        InteractionAction::Dislike,
        InteractionAction::Save,
        InteractionAction::Share,
        InteractionAction::Skip,
        InteractionAction::WatchFull,
    ];

    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Save => "save",
            Self::Share => "share",
            Self::Skip => "skip",
            Self::WatchFull => "watch_full",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_db_str() == s)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Interaction {
    pub id: Id,
    pub user_id: Id,
    pub clip_id: Id,
    pub action: InteractionAction,
    pub watch_duration_seconds: Option<f64>,
    pub watch_percentage: Option<f64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ready_clip_requires_storage_key() {
        let mut clip = sample_clip();
        clip.status = ClipStatus::Ready;
        clip.storage_key.clear();
        assert!(!clip.is_valid_ready());
        clip.storage_key = "clips/abc/video.mp4".into();
        assert!(clip.is_valid_ready());
    }

    #[test]
    fn non_ready_clip_has_no_storage_key_constraint() {
        let mut clip = sample_clip();
        clip.status = ClipStatus::Processing;
        clip.storage_key.clear();
        assert!(clip.is_valid_ready());
    }

    fn sample_clip() -> Clip {
        Clip {
            id: Id::new(),
            source_id: Some(Id::new()),
            title: "carbonara".into(),
            duration_seconds: 30.0,
            start_time: 0.0,
            end_time: 30.0,
            storage_key: String::new(),
            thumbnail_key: None,
            width: None,
            height: None,
            file_size_bytes: 0,
            transcript: None,
            topics: vec![],
            tags: vec![],
            content_score: 0.5,
            expires_at: None,
            is_protected: false,
            status: ClipStatus::Processing,
            created_at: chrono::Utc::now(),
        }
    }
}
