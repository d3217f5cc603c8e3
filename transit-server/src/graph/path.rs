//! Minimum-hop path search over the transit graph.
//!
//! Breadth-first search from an origin stop. Every edge costs one hop, so
//! the first path to reach the destination has the fewest hops. Departure
//! times, transfer waits and service calendars play no part.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use tracing::{debug, trace};

use crate::domain::StopId;

use super::builder::{Edge, TransitGraph};
use super::config::SearchConfig;

/// Error from path search.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The destination cannot be reached from the origin
    #[error("no path from {origin} to {destination}")]
    NotFound { origin: StopId, destination: StopId },

    /// The search exceeded its deadline
    #[error("search timed out after expanding {expanded} stops")]
    Timeout { expanded: usize },
}

/// An ordered sequence of hops from an origin to a destination.
///
/// Empty only when origin and destination are the same stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    edges: Vec<Edge>,
}

impl Path {
    /// The hops in travel order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of hops.
    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    /// Returns true for the zero-hop path.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Consumes the path and returns its hops.
    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }
}

/// Path finder over one graph.
pub struct PathFinder<'a> {
    graph: &'a TransitGraph,
    config: &'a SearchConfig,
}

impl<'a> PathFinder<'a> {
    /// Create a new path finder.
    pub fn new(graph: &'a TransitGraph, config: &'a SearchConfig) -> Self {
        Self { graph, config }
    }

    /// Find a minimum-hop path from `origin` to `destination`.
    ///
    /// A stop is marked visited when it is dequeued, not when it is
    /// enqueued, so a stop can sit in the queue several times before it is
    /// settled. Among paths of equal length the first one discovered, in
    /// edge insertion order, is returned.
    pub fn find(&self, origin: &StopId, destination: &StopId) -> Result<Path, SearchError> {
        let deadline = self.config.timeout().map(|t| Instant::now() + t);

        let mut queue: VecDeque<(&StopId, Vec<&Edge>)> = VecDeque::new();
        let mut visited: HashSet<&StopId> = HashSet::new();
        let mut expanded = 0usize;

        queue.push_back((origin, Vec::new()));

        while let Some((stop, path)) = queue.pop_front() {
            if stop == destination {
                debug!(
                    origin = %origin,
                    destination = %destination,
                    hops = path.len(),
                    expanded,
                    "Path found"
                );
                return Ok(Path {
                    edges: path.into_iter().cloned().collect(),
                });
            }

            if !visited.insert(stop) {
                continue;
            }
            expanded += 1;

            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(origin = %origin, destination = %destination, expanded, "Search timed out");
                return Err(SearchError::Timeout { expanded });
            }

            let edges = self.graph.edges_from(stop.as_str());
            trace!(stop = %stop, edges = edges.len(), queued = queue.len(), "Expanding stop");

            for edge in edges {
                let mut next = path.clone();
                next.push(edge);
                queue.push_back((&edge.to, next));
            }
        }

        debug!(origin = %origin, destination = %destination, expanded, "No path");
        Err(SearchError::NotFound {
            origin: origin.clone(),
            destination: destination.clone(),
        })
    }
}

/// Find a minimum-hop path with no deadline.
pub fn find_path(
    graph: &TransitGraph,
    origin: &StopId,
    destination: &StopId,
) -> Result<Path, SearchError> {
    PathFinder::new(graph, &SearchConfig::unbounded()).find(origin, destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RouteId, TripId};
    use crate::graph::TripStopRow;

    fn stop(s: &str) -> StopId {
        StopId::new(s).unwrap()
    }

    /// Build a graph from trips given as (trip id, route, stops).
    fn graph(trips: &[(&str, &str, &[&str])]) -> TransitGraph {
        let rows = trips.iter().flat_map(|(trip, route, stops)| {
            stops.iter().enumerate().map(move |(i, s)| TripStopRow {
                trip_id: TripId::new(*trip).unwrap(),
                route_id: Some(RouteId::new(*route).unwrap()),
                stop_id: stop(s),
                sequence: i as u32 + 1,
            })
        });
        TransitGraph::build(rows)
    }

    /// Render a path as (to, route) pairs.
    fn hops(path: &Path) -> Vec<(&str, &str)> {
        path.edges()
            .iter()
            .map(|e| (e.to.as_str(), e.route_id.as_ref().map_or("", |r| r.as_str())))
            .collect()
    }

    fn scenario() -> TransitGraph {
        graph(&[("T1", "R1", &["S1", "S2", "S3"]), ("T2", "R2", &["S3", "S4"])])
    }

    #[test]
    fn transfer_between_routes() {
        let g = scenario();
        let path = find_path(&g, &stop("S1"), &stop("S4")).unwrap();
        assert_eq!(hops(&path), vec![("S2", "R1"), ("S3", "R1"), ("S4", "R2")]);
        assert_eq!(path.hops(), 3);
        assert_eq!(path.edges()[0].from.as_str(), "S1");
    }

    #[test]
    fn edges_are_directed() {
        let g = scenario();
        let err = find_path(&g, &stop("S4"), &stop("S1")).unwrap_err();
        assert_eq!(
            err,
            SearchError::NotFound {
                origin: stop("S4"),
                destination: stop("S1"),
            }
        );
    }

    #[test]
    fn trivial_path_is_empty() {
        let g = scenario();
        let path = find_path(&g, &stop("S2"), &stop("S2")).unwrap();
        assert!(path.is_empty());
        assert_eq!(path.hops(), 0);
    }

    #[test]
    fn trivial_path_for_unknown_stop() {
        let g = scenario();
        assert!(find_path(&g, &stop("ZZ"), &stop("ZZ")).unwrap().is_empty());
    }

    #[test]
    fn disconnected_component_is_not_found() {
        let g = graph(&[("T1", "R1", &["A", "B"]), ("T2", "R2", &["C", "D"])]);
        assert!(matches!(
            find_path(&g, &stop("A"), &stop("D")),
            Err(SearchError::NotFound { .. })
        ));
    }

    #[test]
    fn unknown_destination_is_not_found() {
        let g = scenario();
        assert!(matches!(
            find_path(&g, &stop("S1"), &stop("NOPE")),
            Err(SearchError::NotFound { .. })
        ));
    }

    #[test]
    fn unknown_origin_is_not_found() {
        let g = scenario();
        assert!(matches!(
            find_path(&g, &stop("NOPE"), &stop("S3")),
            Err(SearchError::NotFound { .. })
        ));
    }

    #[test]
    fn empty_graph() {
        let g = TransitGraph::default();
        assert!(find_path(&g, &stop("A"), &stop("B")).is_err());
        assert!(find_path(&g, &stop("A"), &stop("A")).is_ok());
    }

    #[test]
    fn prefers_fewer_hops() {
        // Long way round on R1, shortcut on R2 added later.
        let g = graph(&[
            ("T1", "R1", &["A", "B", "C", "D", "E"]),
            ("T2", "R2", &["A", "X", "E"]),
        ]);
        let path = find_path(&g, &stop("A"), &stop("E")).unwrap();
        assert_eq!(hops(&path), vec![("X", "R2"), ("E", "R2")]);
    }

    #[test]
    fn ties_resolve_to_first_discovered() {
        let g = graph(&[
            ("T1", "R1", &["A", "B", "D"]),
            ("T2", "R2", &["A", "C", "D"]),
        ]);
        let path = find_path(&g, &stop("A"), &stop("D")).unwrap();
        assert_eq!(hops(&path), vec![("B", "R1"), ("D", "R1")]);
    }

    #[test]
    fn parallel_edges_pick_first_route() {
        let g = graph(&[("T1", "R7", &["A", "B"]), ("T2", "R3", &["A", "B"])]);
        assert_eq!(g.edges_from("A").len(), 2);
        let path = find_path(&g, &stop("A"), &stop("B")).unwrap();
        assert_eq!(hops(&path), vec![("B", "R7")]);
    }

    #[test]
    fn cycles_terminate() {
        let g = graph(&[
            ("T1", "R1", &["A", "B", "C", "A"]),
            ("T2", "R2", &["C", "B"]),
        ]);
        assert!(find_path(&g, &stop("A"), &stop("Z")).is_err());
        let path = find_path(&g, &stop("C"), &stop("B")).unwrap();
        assert_eq!(hops(&path), vec![("B", "R2")]);
    }

    #[test]
    fn unlabeled_edges_are_traversed() {
        let rows = vec![
            TripStopRow {
                trip_id: TripId::new("GHOST").unwrap(),
                route_id: None,
                stop_id: stop("A"),
                sequence: 1,
            },
            TripStopRow {
                trip_id: TripId::new("GHOST").unwrap(),
                route_id: None,
                stop_id: stop("B"),
                sequence: 2,
            },
        ];
        let g = TransitGraph::build(rows);
        let path = find_path(&g, &stop("A"), &stop("B")).unwrap();
        assert_eq!(path.edges()[0].route_id, None);
    }

    #[test]
    fn zero_timeout_stops_search() {
        let g = scenario();
        let config = SearchConfig::new(Some(0));
        let finder = PathFinder::new(&g, &config);
        assert_eq!(
            finder.find(&stop("S1"), &stop("S4")),
            Err(SearchError::Timeout { expanded: 1 })
        );
        // A trivial path is settled before any expansion.
        assert!(finder.find(&stop("S1"), &stop("S1")).is_ok());
    }

    #[test]
    fn error_display() {
        let err = SearchError::NotFound {
            origin: stop("S4"),
            destination: stop("S1"),
        };
        assert_eq!(err.to_string(), "no path from S4 to S1");

        let err = SearchError::Timeout { expanded: 12 };
        assert_eq!(err.to_string(), "search timed out after expanding 12 stops");
    }
}
