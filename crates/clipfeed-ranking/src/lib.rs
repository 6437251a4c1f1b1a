//! The feed ranking pipeline (C7), similarity engine (C8), and FTS adapter
//! (C10) — §4.7, §4.8, §4.10.

mod candidate;
mod diversity;
mod fts;
mod ltr;
mod pipeline;
mod recall;
mod saved_filter;
mod scoring;
mod similarity;
mod stats;
mod trending;

pub use candidate::{Candidate, UserStats};
pub use diversity::rerank_for_diversity;
pub use fts::{requires_explicit_fts_row, search_clips};
pub use ltr::{LtrModel, Tree, TreeNode};
pub use pipeline::{finalize, FeedItem, PassthroughSigner, ThumbnailSigner, DEFAULT_PAGE_LIMIT};
pub use recall::{recall_candidates, RecallParams};
pub use saved_filter::{recall_with_filter, SavedFilterRecallParams};
pub use scoring::score_candidates;
pub use similarity::{blob_to_vec, cosine_similarity, find_similar_clips, vec_to_blob, SimilarClip};
pub use stats::{load_channel_affinities, load_user_stats, load_user_topic_affinities};
pub use trending::{apply_trending_boost, load_velocity};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Topics(#[from] clipfeed_topics::Error),
    #[error("malformed row: {0}")]
    MalformedRow(String),
    #[error("reference clip has no embedding")]
    NoEmbedding,
}
