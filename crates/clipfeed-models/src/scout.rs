use crate::{Id, OpaqueJson};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoutSource {
    pub id: Id,
    pub owner_id: Id,
    pub platform: String,
    pub config: Option<OpaqueJson>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoutCandidateStatus {
    Pending,
    Ingested,
    Rejected,
}

impl ScoutCandidateStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ingested => "ingested",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "ingested" => Self::Ingested,
            "rejected" => Self::Rejected,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoutCandidate {
    pub id: Id,
    pub scout_source_id: Id,
    pub url: String,
    pub title: Option<String>,
    pub score: Option<f64>,
    pub status: ScoutCandidateStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
