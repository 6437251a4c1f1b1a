mod affinity;
mod graph;
mod snapshot;

pub use affinity::{compute_boost, MAX_DESCENDANT_DEPTH, MAX_LATERAL_HOPS, TOPIC_DECAY_PER_HOP};
pub use graph::TopicGraph;
pub use snapshot::{Edge, TopicNode, TopicSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("malformed row: {0}")]
    MalformedRow(String),
}
