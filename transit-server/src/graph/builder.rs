//! Construction of the transit connectivity graph.
//!
//! The graph is a directed multigraph over stops. Every pair of consecutive
//! stop visits within a trip becomes one edge labeled with the trip's route.
//! Parallel edges (same stops, different trips or routes) are all kept, so
//! route choice at each hop stays visible to the path finder.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::domain::{RouteId, StopId, StopVisit, Trip, TripId};

/// A stop visit joined with its trip's route.
///
/// `route_id` is `None` when the visit references a trip that has no trip
/// record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripStopRow {
    pub trip_id: TripId,
    pub route_id: Option<RouteId>,
    pub stop_id: StopId,
    pub sequence: u32,
}

/// One directed hop between consecutive stops of a trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: StopId,
    pub to: StopId,
    /// Route of the trip that produced this edge, if known.
    pub route_id: Option<RouteId>,
}

/// Directed multigraph of stop-to-stop hops.
///
/// Immutable once built. Stops with no outgoing hops are absent from the
/// adjacency index.
#[derive(Debug, Clone, Default)]
pub struct TransitGraph {
    /// Outgoing edges per stop, in the order the builder emitted them.
    adjacency: HashMap<StopId, Vec<Edge>>,

    /// Distinct routes departing each stop.
    routes_by_stop: HashMap<StopId, BTreeSet<RouteId>>,

    edge_count: usize,
}

impl TransitGraph {
    /// Build a graph from joined stop-visit rows.
    ///
    /// The rows must be sorted by trip id, then by sequence. Only adjacent
    /// rows that share a trip id produce an edge; a pair spanning two trips
    /// never does.
    pub fn build<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = TripStopRow>,
    {
        let mut graph = TransitGraph::default();
        let mut unlabeled = 0usize;
        let mut prev: Option<TripStopRow> = None;

        for row in rows {
            if let Some(from) = prev.take()
                && from.trip_id == row.trip_id
            {
                if from.route_id.is_none() {
                    unlabeled += 1;
                }
                graph.add_edge(Edge {
                    from: from.stop_id,
                    to: row.stop_id.clone(),
                    route_id: from.route_id,
                });
            }
            prev = Some(row);
        }

        if unlabeled > 0 {
            warn!(
                edges = unlabeled,
                "Stop visits reference trips with no trip record; edges have no route"
            );
        }

        debug!(
            stops = graph.adjacency.len(),
            edges = graph.edge_count,
            "Built transit graph"
        );

        graph
    }

    /// Build a graph from unjoined, unsorted feed records.
    ///
    /// Joins each visit with its trip's route and sorts by trip then
    /// sequence before delegating to [`TransitGraph::build`].
    pub fn from_records(trips: &[Trip], visits: &[StopVisit]) -> Self {
        let routes: HashMap<&TripId, &RouteId> =
            trips.iter().map(|t| (&t.id, &t.route_id)).collect();

        let mut rows: Vec<TripStopRow> = visits
            .iter()
            .map(|v| TripStopRow {
                trip_id: v.trip_id.clone(),
                route_id: routes.get(&v.trip_id).map(|r| (*r).clone()),
                stop_id: v.stop_id.clone(),
                sequence: v.sequence,
            })
            .collect();

        rows.sort_by(|a, b| {
            a.trip_id
                .cmp(&b.trip_id)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });

        Self::build(rows)
    }

    fn add_edge(&mut self, edge: Edge) {
        if let Some(route) = &edge.route_id {
            self.routes_by_stop
                .entry(edge.from.clone())
                .or_default()
                .insert(route.clone());
        }
        self.adjacency
            .entry(edge.from.clone())
            .or_default()
            .push(edge);
        self.edge_count += 1;
    }

    /// Outgoing edges of a stop, in insertion order.
    ///
    /// Returns an empty slice for stops with no outgoing hops, including
    /// stops that do not exist.
    pub fn edges_from(&self, stop: &str) -> &[Edge] {
        self.adjacency
            .get(stop)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Distinct routes departing a stop, in id order.
    pub fn routes_from<'a>(
        &'a self,
        stop: &str,
    ) -> impl Iterator<Item = &'a RouteId> + use<'a> {
        self.routes_by_stop.get(stop).into_iter().flatten()
    }

    /// Whether the stop has at least one outgoing edge.
    pub fn contains_stop(&self, stop: &str) -> bool {
        self.adjacency.contains_key(stop)
    }

    /// Number of stops with at least one outgoing edge.
    pub fn stop_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Total number of edges, parallel edges included.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Returns true if the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Trips as lists of stop indices; each trip gets its own route.
    fn trips() -> impl Strategy<Value = Vec<Vec<u8>>> {
        prop::collection::vec(prop::collection::vec(0u8..12, 0..6), 0..8)
    }

    fn rows_for(trips: &[Vec<u8>]) -> Vec<TripStopRow> {
        trips
            .iter()
            .enumerate()
            .flat_map(|(t, stops)| {
                stops.iter().enumerate().map(move |(i, s)| TripStopRow {
                    trip_id: TripId::new(format!("T{t:02}")).unwrap(),
                    route_id: Some(RouteId::new(format!("R{t:02}")).unwrap()),
                    stop_id: StopId::new(format!("S{s}")).unwrap(),
                    sequence: i as u32,
                })
            })
            .collect()
    }

    proptest! {
        /// Each trip of n visits contributes exactly n - 1 edges
        #[test]
        fn edge_count_matches_trip_lengths(trips in trips()) {
            let graph = TransitGraph::build(rows_for(&trips));
            let expected: usize = trips.iter().map(|t| t.len().saturating_sub(1)).sum();
            prop_assert_eq!(graph.edge_count(), expected);
        }

        /// Every edge joins consecutive stops of the one trip its route names
        #[test]
        fn edges_never_span_trips(trips in trips()) {
            let graph = TransitGraph::build(rows_for(&trips));
            for s in 0u8..12 {
                for edge in graph.edges_from(&format!("S{s}")) {
                    let route = edge.route_id.as_ref().unwrap().as_str();
                    let t: usize = route[1..].parse().unwrap();
                    let stops = &trips[t];
                    let joined = stops.windows(2).any(|w| {
                        format!("S{}", w[0]) == edge.from.as_str()
                            && format!("S{}", w[1]) == edge.to.as_str()
                    });
                    prop_assert!(joined, "edge {:?} not consecutive in trip {}", edge, t);
                }
            }
        }
    }
}
