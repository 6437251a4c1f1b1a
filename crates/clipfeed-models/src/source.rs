use crate::{Id, OpaqueJson};

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Pending,
    Downloading,
    Processing,
    Complete,
    Failed,
    Cancelled,
}

impl SourceStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "downloading" => Self::Downloading,
            "processing" => Self::Processing,
            "complete" => Self::Complete,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => return None,
        })
    }
}

/// Platform is inferred from a source URL's host at ingestion time
/// (§4.5): exact match for the big four, suffix match for tiktok's many
/// regional hosts, otherwise a direct file/URL download.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Vimeo,
    Instagram,
    Twitter,
    Tiktok,
    Direct,
}

impl Platform {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Vimeo => "vimeo",
            Self::Instagram => "instagram",
            Self::Twitter => "twitter",
            Self::Tiktok => "tiktok",
            Self::Direct => "direct",
        }
    }

    /// Infers the platform from a validated http(s) host, per §4.5.
    pub fn infer_from_host(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        match host.as_str() {
            "youtube.com" | "www.youtube.com" | "youtu.be" | "m.youtube.com" => Self::Youtube,
            "vimeo.com" | "www.vimeo.com" => Self::Vimeo,
            "instagram.com" | "www.instagram.com" => Self::Instagram,
            "twitter.com" | "www.twitter.com" | "x.com" | "www.x.com" => Self::Twitter,
            _ if host.ends_with("tiktok.com") => Self::Tiktok,
            _ => Self::Direct,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Source {
    pub id: Id,
    pub url: String,
    pub platform: Platform,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub channel_name: Option<String>,
    pub duration_seconds: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<OpaqueJson>,
    pub status: SourceStatus,
    pub submitted_by: Id,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
