//! Object storage is an external collaborator (spec §1: "Object storage...
//! presigned URL minting" is out of core scope). This is the server's one
//! concrete implementation of that seam: clip bytes live under a base
//! directory on disk, and "presigning" is a signed-looking URL carrying an
//! expiry — there is no real object-storage backend in this workspace.
//!
//! `FilesystemObjectStore` implements two distinct `ObjectStore` traits:
//! this module's own (`presign_get` + `delete`, used by the clip-stream
//! route) and `clipfeed_lifecycle::ObjectStore` (`delete` only, used by the
//! storage sweeper). Both are named `ObjectStore`, both have a `delete`
//! method with the same signature — Rust resolves which to call from the
//! trait path in scope at the call site, same as the teacher's controllers
//! implementing more than one narrow seam trait per concrete type.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The client-facing object storage seam: mint a time-limited GET URL for a
/// key, and delete a key outright.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    fn presign_get(&self, key: &str, ttl: Duration) -> String;
    async fn delete(&self, key: &str) -> Result<(), Error>;
}

pub struct FilesystemObjectStore {
    base_dir: PathBuf,
    public_base_url: String,
}

impl FilesystemObjectStore {
    pub fn new(base_dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self { base_dir: base_dir.into(), public_base_url: public_base_url.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }
}

#[async_trait::async_trait]
impl ObjectStore for FilesystemObjectStore {
    fn presign_get(&self, key: &str, ttl: Duration) -> String {
        let expires = (Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default()).timestamp();
        format!("{}/{key}?expires={expires}", self.public_base_url)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait::async_trait]
impl clipfeed_lifecycle::ObjectStore for FilesystemObjectStore {
    async fn delete(&self, key: &str) -> Result<(), clipfeed_lifecycle::ObjectStoreError> {
        ObjectStore::delete(self, key)
            .await
            .map_err(|err| clipfeed_lifecycle::ObjectStoreError(err.to_string()))
    }
}
