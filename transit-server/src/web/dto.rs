//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Route, RouteId, Shape, Stop, StopId};
use crate::feed::FeedCounts;
use crate::graph::{GraphSnapshot, Path};

/// Greeting returned from the root endpoint.
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// A route in lookup results.
#[derive(Debug, Serialize)]
pub struct RouteResult {
    pub route_id: String,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
}

/// A stop in lookup results.
#[derive(Debug, Serialize)]
pub struct StopResult {
    pub stop_id: String,
    pub stop_name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A shape polyline.
#[derive(Debug, Serialize)]
pub struct ShapeResult {
    pub shape_id: String,
    pub points: Vec<ShapePointResult>,
}

/// One point of a shape polyline.
#[derive(Debug, Serialize)]
pub struct ShapePointResult {
    pub lat: f64,
    pub lon: f64,
    pub sequence: u32,
}

/// Routes departing a stop.
#[derive(Debug, Serialize)]
pub struct StopRoutesResponse {
    pub stop_id: String,
    pub routes: Vec<String>,
}

/// Request to find a path between two stops.
///
/// Both fields are optional here so that a missing value gets the same
/// error response as a blank one.
#[derive(Debug, Deserialize)]
pub struct PathRequest {
    /// Origin stop id
    pub origin: Option<String>,

    /// Destination stop id
    pub destination: Option<String>,
}

/// One hop of a path.
#[derive(Debug, Serialize)]
pub struct HopResult {
    /// Stop reached by this hop
    pub to: String,

    /// Route taken, or null when the trip had no trip record
    pub route: Option<String>,
}

/// Response for path finding.
#[derive(Debug, Serialize)]
pub struct PathResponse {
    pub origin: String,
    pub destination: String,

    /// Number of hops (zero when origin is destination)
    pub hops: usize,

    /// Hops in travel order
    pub path: Vec<HopResult>,

    /// Version of the graph the path was found in
    pub graph_version: u64,
}

/// Summary of the current graph.
#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub version: u64,
    pub built_at: String,
    pub stops: usize,
    pub edges: usize,
}

/// Result of reloading the feed.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub graph_version: u64,
    pub routes: usize,
    pub stops: usize,
    pub trips: usize,
    pub stop_visits: usize,
    pub shape_points: usize,
    pub edges: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

// Conversion implementations

impl RouteResult {
    /// Create from a domain Route.
    pub fn from_route(route: &Route) -> Self {
        Self {
            route_id: route.id.to_string(),
            route_short_name: route.short_name.clone(),
            route_long_name: route.long_name.clone(),
        }
    }
}

impl StopResult {
    /// Create from a domain Stop.
    pub fn from_stop(stop: &Stop) -> Self {
        Self {
            stop_id: stop.id.to_string(),
            stop_name: stop.name.clone(),
            lat: stop.lat,
            lon: stop.lon,
        }
    }
}

impl ShapeResult {
    /// Create from a domain Shape.
    pub fn from_shape(shape: &Shape) -> Self {
        Self {
            shape_id: shape.id.to_string(),
            points: shape
                .points
                .iter()
                .map(|p| ShapePointResult {
                    lat: p.lat,
                    lon: p.lon,
                    sequence: p.sequence,
                })
                .collect(),
        }
    }
}

impl StopRoutesResponse {
    /// Create from a stop id and the routes departing it.
    pub fn new<'a>(stop: &StopId, routes: impl Iterator<Item = &'a RouteId>) -> Self {
        Self {
            stop_id: stop.to_string(),
            routes: routes.map(|r| r.to_string()).collect(),
        }
    }
}

impl PathResponse {
    /// Create from a found path.
    pub fn from_path(
        origin: &StopId,
        destination: &StopId,
        path: &Path,
        graph_version: u64,
    ) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            hops: path.hops(),
            path: path
                .edges()
                .iter()
                .map(|e| HopResult {
                    to: e.to.to_string(),
                    route: e.route_id.as_ref().map(|r| r.to_string()),
                })
                .collect(),
            graph_version,
        }
    }
}

impl GraphResponse {
    /// Create from a graph snapshot.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        Self {
            version: snapshot.version,
            built_at: snapshot.built_at.to_rfc3339(),
            stops: snapshot.graph.stop_count(),
            edges: snapshot.graph.edge_count(),
        }
    }
}

impl ReloadResponse {
    /// Create from the imported counts and the published graph.
    pub fn new(counts: FeedCounts, graph_version: u64, edges: usize) -> Self {
        Self {
            graph_version,
            routes: counts.routes,
            stops: counts.stops,
            trips: counts.trips,
            stop_visits: counts.stop_visits,
            shape_points: counts.shape_points,
            edges,
        }
    }
}
