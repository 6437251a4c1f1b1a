//! Job Queue & Worker Coordination Core (C4): atomic claim, transitions,
//! stale watchdog, and admin purge over the `jobs`/`sources` tables.
//!
//! Every operation here runs through [`clipfeed_dialect::with_tx`] so a
//! claim, transition, or purge either fully applies or has no effect at
//! all, even under concurrent callers racing the same rows.

mod claim;
mod lookup;
mod purge;
mod row;
mod transitions;
mod util;
mod watchdog;

pub use claim::claim;
pub use lookup::{get, list_for_owner};
pub use purge::purge;
pub use transitions::{cancel, dismiss, retry, update};
pub use watchdog::reclaim_stale;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("malformed row: {0}")]
    MalformedRow(String),
    #[error("job not found")]
    NotFound,
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: clipfeed_models::JobStatus,
        to: clipfeed_models::JobStatus,
    },
    #[error("caller does not own this job")]
    Forbidden,
}
