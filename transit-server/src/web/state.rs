//! Application state for the web layer.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::feed::{CachedFeed, FeedCounts, FeedError, Reimport};
use crate::graph::{SearchConfig, SharedGraph};

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Feed store with cached lookups
    pub feed: Arc<CachedFeed>,

    /// Current transit graph
    pub graph: SharedGraph,

    /// Path search configuration
    pub search: Arc<SearchConfig>,

    /// Directory the feed is reloaded from
    pub gtfs_dir: Arc<PathBuf>,

    /// Held for the duration of a reload so reloads never interleave
    reload_lock: Arc<Mutex<()>>,
}

/// Outcome of a successful feed reload.
#[derive(Debug, Clone, Copy)]
pub struct Reloaded {
    pub counts: FeedCounts,
    pub graph_version: u64,
    pub edges: usize,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        feed: CachedFeed,
        graph: SharedGraph,
        search: SearchConfig,
        gtfs_dir: PathBuf,
    ) -> Self {
        Self {
            feed: Arc::new(feed),
            graph,
            search: Arc::new(search),
            gtfs_dir: Arc::new(gtfs_dir),
            reload_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Re-read the feed directory, rebuild the graph and publish it.
    ///
    /// The graph is built from the parsed feed before the store is touched,
    /// so a failure leaves the previous feed and graph in place. The work
    /// runs on its own task and completes even if the caller is dropped.
    pub async fn reload(&self) -> Result<Reloaded, FeedError> {
        let state = self.clone();
        tokio::spawn(async move { state.reload_now().await })
            .await
            .map_err(|e| FeedError::Task(e.to_string()))?
    }

    async fn reload_now(&self) -> Result<Reloaded, FeedError> {
        let _guard = self.reload_lock.lock().await;

        info!(dir = %self.gtfs_dir.display(), "Reloading feed");
        let Reimport { counts, graph } = self.feed.reimport(self.gtfs_dir.to_path_buf()).await?;
        let edges = graph.edge_count();
        let graph_version = self.graph.replace(graph).await;

        Ok(Reloaded {
            counts,
            graph_version,
            edges,
        })
    }
}
