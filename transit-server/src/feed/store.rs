//! SQLite-backed feed store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::domain::{Route, RouteId, Shape, ShapeId, ShapePoint, Stop, StopId, TripId};
use crate::graph::TripStopRow;

use super::error::FeedError;
use super::gtfs::Feed;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS routes (
  route_id TEXT PRIMARY KEY,
  route_short_name TEXT,
  route_long_name TEXT
);

CREATE TABLE IF NOT EXISTS stops (
  stop_id TEXT PRIMARY KEY,
  stop_name TEXT NOT NULL,
  lat REAL NOT NULL,
  lon REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS trips (
  trip_id TEXT PRIMARY KEY,
  route_id TEXT NOT NULL,
  shape_id TEXT
);

CREATE TABLE IF NOT EXISTS stop_times (
  trip_id TEXT NOT NULL,
  stop_id TEXT NOT NULL,
  stop_sequence INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS stop_times_by_trip ON stop_times (trip_id, stop_sequence);
CREATE INDEX IF NOT EXISTS trips_by_route ON trips (route_id);

CREATE TABLE IF NOT EXISTS shapes (
  shape_id TEXT NOT NULL,
  lat REAL NOT NULL,
  lon REAL NOT NULL,
  shape_pt_sequence INTEGER NOT NULL
);
";

/// Number of rows held per record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedCounts {
    pub routes: usize,
    pub stops: usize,
    pub trips: usize,
    pub stop_visits: usize,
    pub shape_points: usize,
}

/// Durable store for feed records.
///
/// Cloning shares the underlying connection. All methods block; async
/// callers should go through [`super::CachedFeed`].
#[derive(Clone)]
pub struct FeedStore {
    conn: Arc<Mutex<Connection>>,
}

impl FeedStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, FeedError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, FeedError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, FeedError> {
        self.conn.lock().map_err(|_| FeedError::LockPoisoned)
    }

    /// Whether a feed has been loaded.
    pub fn is_loaded(&self) -> Result<bool, FeedError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM routes", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Replace the stored feed with `feed` in a single transaction.
    pub fn replace_feed(&self, feed: &Feed) -> Result<FeedCounts, FeedError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute_batch(
            "DELETE FROM routes; DELETE FROM stops; DELETE FROM trips;
             DELETE FROM stop_times; DELETE FROM shapes;",
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO routes (route_id, route_short_name, route_long_name) VALUES (?1, ?2, ?3)",
            )?;
            for route in &feed.routes {
                insert.execute(params![
                    route.id.as_str(),
                    route.short_name,
                    route.long_name
                ])?;
            }

            let mut insert = tx.prepare(
                "INSERT INTO stops (stop_id, stop_name, lat, lon) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for stop in &feed.stops {
                insert.execute(params![stop.id.as_str(), stop.name, stop.lat, stop.lon])?;
            }

            let mut insert =
                tx.prepare("INSERT INTO trips (trip_id, route_id, shape_id) VALUES (?1, ?2, ?3)")?;
            for trip in &feed.trips {
                insert.execute(params![
                    trip.id.as_str(),
                    trip.route_id.as_str(),
                    trip.shape_id.as_ref().map(|s| s.as_str())
                ])?;
            }

            let mut insert = tx.prepare(
                "INSERT INTO stop_times (trip_id, stop_id, stop_sequence) VALUES (?1, ?2, ?3)",
            )?;
            for visit in &feed.stop_visits {
                insert.execute(params![
                    visit.trip_id.as_str(),
                    visit.stop_id.as_str(),
                    visit.sequence
                ])?;
            }

            let mut insert = tx.prepare(
                "INSERT INTO shapes (shape_id, lat, lon, shape_pt_sequence) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for point in &feed.shape_points {
                insert.execute(params![
                    point.shape_id.as_str(),
                    point.lat,
                    point.lon,
                    point.sequence
                ])?;
            }
        }

        tx.commit()?;

        let counts = FeedCounts {
            routes: feed.routes.len(),
            stops: feed.stops.len(),
            trips: feed.trips.len(),
            stop_visits: feed.stop_visits.len(),
            shape_points: feed.shape_points.len(),
        };
        info!(?counts, "Stored feed");
        Ok(counts)
    }

    /// All routes, in load order.
    pub fn routes(&self) -> Result<Vec<Route>, FeedError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT route_id, route_short_name, route_long_name FROM routes ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut routes = Vec::new();
        for row in rows {
            let (id, short_name, long_name) = row?;
            routes.push(Route {
                id: RouteId::new(id).map_err(|e| corrupt("routes", e))?,
                short_name,
                long_name,
            });
        }
        Ok(routes)
    }

    /// Look up one route.
    pub fn route(&self, id: &RouteId) -> Result<Option<Route>, FeedError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT route_short_name, route_long_name FROM routes WHERE route_id = ?1",
        )?;
        let found = stmt
            .query_row(params![id.as_str()], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                ))
            })
            .optional()?;

        Ok(found.map(|(short_name, long_name)| Route {
            id: id.clone(),
            short_name,
            long_name,
        }))
    }

    /// Look up one stop.
    pub fn stop(&self, id: &StopId) -> Result<Option<Stop>, FeedError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare_cached("SELECT stop_name, lat, lon FROM stops WHERE stop_id = ?1")?;
        let found = stmt
            .query_row(params![id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })
            .optional()?;

        found
            .map(|(name, lat, lon)| {
                Stop::new(id.clone(), name, lat, lon).map_err(|e| corrupt("stops", e))
            })
            .transpose()
    }

    /// Distinct stops visited by any trip of the route.
    ///
    /// Ordered by the earliest sequence position at which any trip of the
    /// route visits the stop, then by stop id.
    pub fn stops_for_route(&self, route: &RouteId) -> Result<Vec<Stop>, FeedError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT s.stop_id, s.stop_name, s.lat, s.lon, MIN(st.stop_sequence) AS first_seq
             FROM trips t
             JOIN stop_times st ON t.trip_id = st.trip_id
             JOIN stops s ON st.stop_id = s.stop_id
             WHERE t.route_id = ?1
             GROUP BY s.stop_id
             ORDER BY first_seq, s.stop_id",
        )?;
        let rows = stmt.query_map(params![route.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut stops = Vec::new();
        for row in rows {
            let (id, name, lat, lon) = row?;
            let id = StopId::new(id).map_err(|e| corrupt("stops", e))?;
            stops.push(Stop::new(id, name, lat, lon).map_err(|e| corrupt("stops", e))?);
        }
        Ok(stops)
    }

    /// Shape polylines used by the route's trips, ordered by shape id.
    pub fn shapes_for_route(&self, route: &RouteId) -> Result<Vec<Shape>, FeedError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT shape_id, lat, lon, shape_pt_sequence
             FROM shapes
             WHERE shape_id IN (SELECT DISTINCT shape_id FROM trips WHERE route_id = ?1)
             ORDER BY shape_id, shape_pt_sequence",
        )?;
        let rows = stmt.query_map(params![route.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, u32>(3)?,
            ))
        })?;

        let mut shapes: Vec<Shape> = Vec::new();
        for row in rows {
            let (id, lat, lon, sequence) = row?;
            let id = ShapeId::new(id).map_err(|e| corrupt("shapes", e))?;
            let point =
                ShapePoint::new(id.clone(), lat, lon, sequence).map_err(|e| corrupt("shapes", e))?;
            match shapes.last_mut() {
                Some(shape) if shape.id == id => shape.points.push(point),
                _ => shapes.push(Shape {
                    id,
                    points: vec![point],
                }),
            }
        }
        Ok(shapes)
    }

    /// Every stop visit joined with its trip's route, sorted by trip then
    /// sequence.
    ///
    /// Visits whose trip has no trip record come back with no route.
    pub fn trip_stop_rows(&self) -> Result<Vec<TripStopRow>, FeedError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT st.trip_id, t.route_id, st.stop_id, st.stop_sequence
             FROM stop_times st
             LEFT JOIN trips t ON t.trip_id = st.trip_id
             ORDER BY st.trip_id, st.stop_sequence",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (trip_id, route_id, stop_id, sequence) = row?;
            out.push(TripStopRow {
                trip_id: TripId::new(trip_id).map_err(|e| corrupt("stop_times", e))?,
                route_id: route_id
                    .map(RouteId::new)
                    .transpose()
                    .map_err(|e| corrupt("trips", e))?,
                stop_id: StopId::new(stop_id).map_err(|e| corrupt("stop_times", e))?,
                sequence,
            });
        }
        Ok(out)
    }

    /// Row counts per table.
    pub fn counts(&self) -> Result<FeedCounts, FeedError> {
        let conn = self.lock()?;
        let count = |table: &str| -> Result<usize, FeedError> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(FeedCounts {
            routes: count("routes")?,
            stops: count("stops")?,
            trips: count("trips")?,
            stop_visits: count("stop_times")?,
            shape_points: count("shapes")?,
        })
    }
}

fn corrupt(table: &'static str, err: impl std::fmt::Display) -> FeedError {
    FeedError::CorruptRow {
        table,
        reason: err.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{StopVisit, Trip};
    use tempfile::tempdir;

    fn route(id: &str, short: &str) -> Route {
        Route {
            id: RouteId::new(id).unwrap(),
            short_name: Some(short.to_string()),
            long_name: None,
        }
    }

    fn stop(id: &str) -> Stop {
        Stop::new(StopId::new(id).unwrap(), format!("Stop {id}"), 37.7, -122.4).unwrap()
    }

    fn trip(id: &str, route: &str, shape: Option<&str>) -> Trip {
        Trip {
            id: TripId::new(id).unwrap(),
            route_id: RouteId::new(route).unwrap(),
            shape_id: shape.map(|s| ShapeId::new(s).unwrap()),
        }
    }

    fn visit(trip: &str, stop: &str, seq: u32) -> StopVisit {
        StopVisit {
            trip_id: TripId::new(trip).unwrap(),
            stop_id: StopId::new(stop).unwrap(),
            sequence: seq,
        }
    }

    fn point(shape: &str, seq: u32) -> ShapePoint {
        let lon = -122.4 + seq as f64 * 0.01;
        ShapePoint::new(ShapeId::new(shape).unwrap(), 37.7, lon, seq).unwrap()
    }

    /// T1 = [S1, S2, S3] on R1, T2 = [S3, S4] on R2, plus a visit to a trip
    /// with no trip record.
    pub(crate) fn sample_feed() -> Feed {
        Feed {
            routes: vec![route("R1", "1"), route("R2", "2")],
            stops: vec![stop("S1"), stop("S2"), stop("S3"), stop("S4")],
            trips: vec![trip("T1", "R1", Some("SH1")), trip("T2", "R2", None)],
            stop_visits: vec![
                visit("T2", "S4", 2),
                visit("T1", "S3", 3),
                visit("T1", "S1", 1),
                visit("T2", "S3", 1),
                visit("T1", "S2", 2),
                visit("T9", "S4", 1),
                visit("T9", "S1", 2),
            ],
            shape_points: vec![point("SH1", 2), point("SH1", 1), point("SH9", 1)],
        }
    }

    fn loaded() -> FeedStore {
        let store = FeedStore::open_in_memory().unwrap();
        store.replace_feed(&sample_feed()).unwrap();
        store
    }

    #[test]
    fn empty_store_is_not_loaded() {
        let store = FeedStore::open_in_memory().unwrap();
        assert!(!store.is_loaded().unwrap());
        assert_eq!(store.counts().unwrap(), FeedCounts::default());
    }

    #[test]
    fn replace_feed_stores_everything() {
        let store = FeedStore::open_in_memory().unwrap();
        let counts = store.replace_feed(&sample_feed()).unwrap();

        assert!(store.is_loaded().unwrap());
        assert_eq!(counts, store.counts().unwrap());
        assert_eq!(
            counts,
            FeedCounts {
                routes: 2,
                stops: 4,
                trips: 2,
                stop_visits: 7,
                shape_points: 3,
            }
        );
    }

    #[test]
    fn replace_feed_discards_previous_feed() {
        let store = loaded();
        let smaller = Feed {
            routes: vec![route("R9", "9")],
            ..Feed::default()
        };
        store.replace_feed(&smaller).unwrap();

        let routes = store.routes().unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].id.as_str(), "R9");
        assert_eq!(store.counts().unwrap().stop_visits, 0);
    }

    #[test]
    fn duplicate_ids_roll_back() {
        let store = loaded();
        let mut feed = sample_feed();
        feed.routes.push(route("R1", "again"));

        assert!(matches!(
            store.replace_feed(&feed),
            Err(FeedError::Sqlite(_))
        ));
        // The earlier feed survives the failed replacement.
        assert_eq!(store.counts().unwrap().routes, 2);
    }

    #[test]
    fn routes_in_load_order() {
        let routes = loaded().routes().unwrap();
        let ids: Vec<&str> = routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["R1", "R2"]);
        assert_eq!(routes[0].short_name.as_deref(), Some("1"));
    }

    #[test]
    fn route_lookup() {
        let store = loaded();
        assert!(store.route(&RouteId::new("R2").unwrap()).unwrap().is_some());
        assert!(store.route(&RouteId::new("R7").unwrap()).unwrap().is_none());
    }

    #[test]
    fn stop_lookup() {
        let store = loaded();
        let stop = store.stop(&StopId::new("S2").unwrap()).unwrap().unwrap();
        assert_eq!(stop.name, "Stop S2");
        assert!(store.stop(&StopId::new("S404").unwrap()).unwrap().is_none());
    }

    #[test]
    fn stops_for_route_are_distinct_and_ordered() {
        let store = loaded();
        let stops = store.stops_for_route(&RouteId::new("R1").unwrap()).unwrap();
        let ids: Vec<&str> = stops.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);
        assert_eq!(stops[0].name, "Stop S1");

        let stops = store.stops_for_route(&RouteId::new("R2").unwrap()).unwrap();
        let ids: Vec<&str> = stops.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S3", "S4"]);

        assert!(store
            .stops_for_route(&RouteId::new("R7").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn shapes_for_route_groups_points() {
        let store = loaded();
        let shapes = store.shapes_for_route(&RouteId::new("R1").unwrap()).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].id.as_str(), "SH1");
        let seqs: Vec<u32> = shapes[0].points.iter().map(|p| p.sequence).collect();
        assert_eq!(seqs, vec![1, 2]);

        assert!(store
            .shapes_for_route(&RouteId::new("R2").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn trip_stop_rows_are_sorted_and_joined() {
        let rows = loaded().trip_stop_rows().unwrap();
        let flat: Vec<(&str, Option<&str>, &str, u32)> = rows
            .iter()
            .map(|r| {
                (
                    r.trip_id.as_str(),
                    r.route_id.as_ref().map(|r| r.as_str()),
                    r.stop_id.as_str(),
                    r.sequence,
                )
            })
            .collect();
        assert_eq!(
            flat,
            vec![
                ("T1", Some("R1"), "S1", 1),
                ("T1", Some("R1"), "S2", 2),
                ("T1", Some("R1"), "S3", 3),
                ("T2", Some("R2"), "S3", 1),
                ("T2", Some("R2"), "S4", 2),
                ("T9", None, "S4", 1),
                ("T9", None, "S1", 2),
            ]
        );
    }

    #[test]
    fn reopening_file_keeps_feed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transit.db");

        FeedStore::open(&path)
            .unwrap()
            .replace_feed(&sample_feed())
            .unwrap();

        let reopened = FeedStore::open(&path).unwrap();
        assert!(reopened.is_loaded().unwrap());
        assert_eq!(reopened.counts().unwrap().trips, 2);
    }
}
