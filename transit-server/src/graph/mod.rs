//! Transit connectivity graph and path search.
//!
//! This module builds a directed multigraph from the stop visits of a feed
//! and answers "how do I get from this stop to that one?" with the path of
//! fewest hops.

mod builder;
mod config;
mod path;
mod snapshot;

pub use builder::{Edge, TransitGraph, TripStopRow};
pub use config::SearchConfig;
pub use path::{Path, PathFinder, SearchError, find_path};
pub use snapshot::{GraphSnapshot, SharedGraph};
