use std::sync::Arc;
use std::time::Duration;

use clipfeed_dialect::DialectHandle;

use crate::snapshot::{self, TopicSnapshot};
use crate::Error;

/// In-memory topic graph, refreshed every 5 minutes and on demand (§4.6).
/// Readers take a shared read lock and clone the `Arc`, so concurrent
/// readers never block each other; a refresh takes the write lock only
/// long enough to swap the `Arc` itself, not to rebuild it under lock.
pub struct TopicGraph {
    current: tokio::sync::RwLock<Arc<TopicSnapshot>>,
}

impl TopicGraph {
    /// Default periodic refresh cadence (§4.6).
    pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

    pub fn empty() -> Self {
        Self {
            current: tokio::sync::RwLock::new(Arc::new(TopicSnapshot::default())),
        }
    }

    /// Returns the currently active snapshot. Cheap: an `Arc` clone under
    /// a shared read lock.
    pub async fn load(&self) -> Arc<TopicSnapshot> {
        self.current.read().await.clone()
    }

    /// Rebuilds the snapshot from the database and atomically swaps it
    /// in. The expensive part (the database scan) happens before the
    /// write lock is acquired, so readers are blocked only for the swap.
    pub async fn refresh(&self, handle: &DialectHandle) -> Result<(), Error> {
        let fresh = snapshot::load(handle).await?;
        let mut guard = self.current.write().await;
        *guard = Arc::new(fresh);
        Ok(())
    }

    /// Runs [`refresh`](Self::refresh) on a fixed interval until the
    /// process shuts down. Errors are logged and retried on the next
    /// tick rather than aborting the loop — a transient DB hiccup must
    /// not leave the server running on a permanently stale graph.
    pub async fn run_refresh_loop(self: Arc<Self>, handle: DialectHandle) {
        let mut ticker = tokio::time::interval(Self::REFRESH_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(err) = self.refresh(&handle).await {
                tracing::error!(error = %err, "topic graph refresh failed; keeping previous snapshot");
            }
        }
    }
}

impl Default for TopicGraph {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clipfeed_dialect::Dialect;

    async fn seeded_handle() -> DialectHandle {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let handle = DialectHandle::from_pool(pool, Dialect::Embedded);
        clipfeed_migrations::run(&handle).await.unwrap();
        handle
    }

    #[tokio::test]
    async fn starts_empty_and_refreshes_in_place() {
        let handle = seeded_handle().await;
        let graph = TopicGraph::empty();
        assert!(graph.load().await.is_empty());

        sqlx::query(
            "INSERT INTO topics (id, name, slug, path, parent_id, depth, clip_count) \
             VALUES (?, 'Cooking', 'cooking', '/cooking', NULL, 0, 0)",
        )
        .bind(clipfeed_models::Id::new().to_string())
        .execute(handle.pool())
        .await
        .unwrap();

        graph.refresh(&handle).await.unwrap();
        assert_eq!(graph.load().await.len(), 1);
    }

    #[tokio::test]
    async fn readers_see_a_consistent_snapshot_across_a_refresh() {
        let handle = seeded_handle().await;
        let graph = Arc::new(TopicGraph::empty());

        let before = graph.load().await;
        graph.refresh(&handle).await.unwrap();
        let after = graph.load().await;

        assert_eq!(before.len(), 0);
        assert_eq!(after.len(), 0);
        assert!(!Arc::ptr_eq(&before, &after));
    }
}
