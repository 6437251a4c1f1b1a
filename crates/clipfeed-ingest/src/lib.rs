mod clip;
mod create;
mod profile;
mod scout;
mod submit;
mod validate;

pub use clip::{create_clip, resolve_topic, CreateClipRequest};
pub use profile::{load_scout_profile, ScoutProfile};
pub use scout::approve_candidate;
pub use submit::submit_url;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("malformed row: {0}")]
    MalformedRow(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("not found")]
    NotFound,
    #[error("caller does not own this resource")]
    Forbidden,
    #[error("candidate is not pending")]
    NotPending,
}
