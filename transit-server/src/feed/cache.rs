//! Async access to the feed store with cached lookups.
//!
//! Store calls block on SQLite, so they run on the blocking pool. Route
//! lists and per-route stop lists are served from an in-memory cache that
//! is cleared whenever the feed is replaced.
//!
//! Cache misses are filled under a shared lock and the feed is replaced
//! under the exclusive one. A fill therefore either finishes before the
//! replacement (and is cleared with the rest of the cache) or reads the new
//! feed; it never stores rows from a feed that was replaced under it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{Route, RouteId, Shape, Stop, StopId};
use crate::graph::TransitGraph;

use super::error::FeedError;
use super::gtfs::Feed;
use super::store::{FeedCounts, FeedStore};

/// Cached route list entry.
type RoutesEntry = Arc<Vec<Route>>;

/// Cached stops-for-route entry.
type StopsEntry = Arc<Vec<Stop>>;

/// Configuration for the lookup cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached per-route entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_capacity: 1000,
        }
    }
}

/// Outcome of replacing the stored feed.
#[derive(Debug)]
pub struct Reimport {
    /// Rows now in the store.
    pub counts: FeedCounts,

    /// Graph built from the feed that was stored.
    pub graph: TransitGraph,
}

/// Feed store with caching, for use from async code.
pub struct CachedFeed {
    store: FeedStore,

    /// The full route list, under the unit key.
    routes: MokaCache<(), RoutesEntry>,

    /// Stops per route.
    route_stops: MokaCache<RouteId, StopsEntry>,

    /// Shared while a cache miss is filled, exclusive while the feed is
    /// replaced.
    fill_lock: RwLock<()>,
}

impl CachedFeed {
    /// Create a new cached feed over `store`.
    pub fn new(store: FeedStore, config: &CacheConfig) -> Self {
        let routes = MokaCache::builder().time_to_live(config.ttl).max_capacity(1).build();
        let route_stops = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            store,
            routes,
            route_stops,
            fill_lock: RwLock::new(()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    /// Run a blocking store operation on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T, FeedError>
    where
        T: Send + 'static,
        F: FnOnce(FeedStore) -> Result<T, FeedError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(store))
            .await
            .map_err(|e| FeedError::Task(e.to_string()))?
    }

    /// All routes, using the cache if available.
    pub async fn routes(&self) -> Result<RoutesEntry, FeedError> {
        if let Some(cached) = self.routes.get(&()).await {
            return Ok(cached);
        }

        let _fill = self.fill_lock.read().await;
        let routes = Arc::new(self.blocking(|store| store.routes()).await?);
        self.routes.insert((), routes.clone()).await;
        Ok(routes)
    }

    /// Look up one route.
    pub async fn route(&self, id: &RouteId) -> Result<Option<Route>, FeedError> {
        let id = id.clone();
        self.blocking(move |store| store.route(&id)).await
    }

    /// Look up one stop.
    pub async fn stop(&self, id: &StopId) -> Result<Option<Stop>, FeedError> {
        let id = id.clone();
        self.blocking(move |store| store.stop(&id)).await
    }

    /// Distinct stops of a route, using the cache if available.
    pub async fn stops_for_route(&self, id: &RouteId) -> Result<StopsEntry, FeedError> {
        if let Some(cached) = self.route_stops.get(id).await {
            return Ok(cached);
        }

        let _fill = self.fill_lock.read().await;
        let key = id.clone();
        let stops = Arc::new(self.blocking(move |store| store.stops_for_route(&key)).await?);
        self.route_stops.insert(id.clone(), stops.clone()).await;
        Ok(stops)
    }

    /// Shape polylines of a route. Not cached.
    pub async fn shapes_for_route(&self, id: &RouteId) -> Result<Vec<Shape>, FeedError> {
        let id = id.clone();
        self.blocking(move |store| store.shapes_for_route(&id)).await
    }

    /// Row counts per table.
    pub async fn counts(&self) -> Result<FeedCounts, FeedError> {
        self.blocking(|store| store.counts()).await
    }

    /// Build a transit graph from the stored stop visits.
    pub async fn build_graph(&self) -> Result<TransitGraph, FeedError> {
        self.blocking(|store| {
            let rows = store.trip_stop_rows()?;
            Ok(TransitGraph::build(rows))
        })
        .await
    }

    /// Import the feed directory if the store is empty.
    ///
    /// Returns the counts of what was imported, or `None` if a feed was
    /// already loaded.
    pub async fn import_if_empty(&self, dir: PathBuf) -> Result<Option<FeedCounts>, FeedError> {
        let _replace = self.fill_lock.write().await;
        let imported = self
            .blocking(move |store| {
                if store.is_loaded()? {
                    return Ok(None);
                }
                let feed = Feed::read_dir(&dir)?;
                store.replace_feed(&feed).map(Some)
            })
            .await?;

        match imported {
            Some(counts) => {
                self.invalidate_all();
                Ok(Some(counts))
            }
            None => {
                info!("Feed already loaded, skipping import");
                Ok(None)
            }
        }
    }

    /// Re-read the feed directory and replace the stored feed.
    ///
    /// The graph is built from the parsed feed before anything is committed,
    /// so once this returns `Ok` the store and the returned graph describe
    /// the same feed. A failed read leaves both store and cache untouched.
    pub async fn reimport(&self, dir: PathBuf) -> Result<Reimport, FeedError> {
        let (feed, graph) = self
            .blocking(move |_| {
                let feed = Feed::read_dir(&dir)?;
                let graph = TransitGraph::from_records(&feed.trips, &feed.stop_visits);
                Ok((feed, graph))
            })
            .await?;

        let _replace = self.fill_lock.write().await;
        let counts = self.blocking(move |store| store.replace_feed(&feed)).await?;
        self.invalidate_all();

        Ok(Reimport { counts, graph })
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        debug!("Invalidating feed lookup cache");
        self.routes.invalidate_all();
        self.route_stops.invalidate_all();
    }
}
