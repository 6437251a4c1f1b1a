/// The object-storage seam the sweeper deletes clip bytes through. Object
/// storage is an external collaborator (§1); this mirrors the
/// `ControlPlane`-style trait seam the teacher uses to keep controllers
/// (here, the sweeper) testable without a live backend.
///
/// Per §4.11's crash-safety note, deleting a key that is already gone MUST
/// be treated as success — implementations should swallow a
/// not-found/404 from the underlying store rather than surfacing it.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}

#[derive(Debug, thiserror::Error)]
#[error("object store delete failed: {0}")]
pub struct ObjectStoreError(pub String);

/// A no-op store for tests: every delete succeeds and is recorded.
#[cfg(any(test, feature = "test-util"))]
pub struct RecordingStore {
    pub deleted: std::sync::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingStore {
    pub fn new() -> Self {
        Self { deleted: std::sync::Mutex::new(Vec::new()) }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for RecordingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait::async_trait]
impl ObjectStore for RecordingStore {
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
