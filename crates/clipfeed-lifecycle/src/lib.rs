//! The lifecycle sweeper (C11, §4.11): a library invoked by an external
//! periodic trigger (cron, or the `sweep` CLI subcommand) rather than
//! owning its own HTTP surface or an in-process scheduling loop.

mod evict;
mod expire;
mod object_store;
mod sweep;

pub use evict::evict_under_pressure;
pub use expire::expire_clips;
pub use object_store::{ObjectStore, ObjectStoreError};
#[cfg(any(test, feature = "test-util"))]
pub use object_store::RecordingStore;
pub use sweep::{sweep_once, SweepCounts};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Queue(#[from] clipfeed_queue::Error),
    #[error("malformed row: {0}")]
    MalformedRow(String),
}
