//! Versioned graph snapshots shared across requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use super::builder::TransitGraph;

/// An immutable graph together with when it was built.
#[derive(Debug)]
pub struct GraphSnapshot {
    /// Increases by one every time the graph is replaced.
    pub version: u64,

    /// When this graph was published.
    pub built_at: DateTime<Utc>,

    pub graph: TransitGraph,
}

/// Thread-safe handle to the current graph snapshot.
///
/// Readers take an `Arc` to the snapshot and drop the lock straight away,
/// so a reload swaps in a fully built graph while in-flight searches keep
/// the one they started with.
#[derive(Clone)]
pub struct SharedGraph {
    inner: Arc<RwLock<Arc<GraphSnapshot>>>,
}

impl SharedGraph {
    /// Publish an initial graph as version 1.
    pub fn new(graph: TransitGraph) -> Self {
        let snapshot = GraphSnapshot {
            version: 1,
            built_at: Utc::now(),
            graph,
        };
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The current snapshot.
    pub async fn current(&self) -> Arc<GraphSnapshot> {
        let guard = self.inner.read().await;
        Arc::clone(&guard)
    }

    /// Replace the graph, returning the new version.
    pub async fn replace(&self, graph: TransitGraph) -> u64 {
        let mut guard = self.inner.write().await;
        let version = guard.version + 1;

        info!(
            version,
            stops = graph.stop_count(),
            edges = graph.edge_count(),
            "Publishing transit graph"
        );

        *guard = Arc::new(GraphSnapshot {
            version,
            built_at: Utc::now(),
            graph,
        });
        version
    }
}
