//! Static feed ingestion and storage.
//!
//! Reads GTFS text files into typed records, keeps them in SQLite, and
//! serves the simple lookups (routes, stops of a route, shapes) plus the
//! joined stop-visit stream the graph is built from.

mod cache;
mod error;
mod gtfs;
mod store;

pub use cache::{CacheConfig, CachedFeed, Reimport};
pub use error::FeedError;
pub use gtfs::Feed;
pub use store::{FeedCounts, FeedStore};
