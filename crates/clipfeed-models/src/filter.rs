use crate::Id;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicFilterMode {
    Names,
    Descendants,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TopicFilter {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub mode: Option<TopicFilterMode>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DurationFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// SavedFilter is a persisted feed query (§3, §4.7 "Saved filters").
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SavedFilterBody {
    #[serde(default)]
    pub topics: TopicFilter,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub duration: DurationFilter,
    pub recency_days: Option<i64>,
    pub min_score: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SavedFilter {
    pub id: Id,
    pub user_id: Id,
    pub name: String,
    pub body: SavedFilterBody,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
