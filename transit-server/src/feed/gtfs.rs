//! Reading a static feed from a directory of GTFS text files.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::domain::{Route, RouteId, ShapeId, ShapePoint, Stop, StopId, StopVisit, Trip, TripId};

use super::error::FeedError;

pub const ROUTES_FILE: &str = "routes.txt";
pub const TRIPS_FILE: &str = "trips.txt";
pub const STOP_TIMES_FILE: &str = "stop_times.txt";
pub const STOPS_FILE: &str = "stops.txt";
pub const SHAPES_FILE: &str = "shapes.txt";

/// All record sets of a static feed, validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub routes: Vec<Route>,
    pub stops: Vec<Stop>,
    pub trips: Vec<Trip>,
    pub stop_visits: Vec<StopVisit>,
    pub shape_points: Vec<ShapePoint>,
}

impl Feed {
    /// Read a feed from a directory of GTFS files.
    ///
    /// `routes.txt`, `trips.txt`, `stop_times.txt` and `stops.txt` are
    /// required. `shapes.txt` is optional and yields no shape points when
    /// absent. Generic nodes and boarding areas without coordinates are
    /// skipped. Any other row that fails to parse or validate aborts the read.
    pub fn read_dir(dir: impl AsRef<Path>) -> Result<Self, FeedError> {
        let dir = dir.as_ref();

        let routes = read_required(dir, ROUTES_FILE, RouteRow::into_record)?;
        let trips = read_required(dir, TRIPS_FILE, TripRow::into_record)?;
        let stop_visits = read_required(dir, STOP_TIMES_FILE, StopTimeRow::into_record)?;
        let stop_rows = read_required(dir, STOPS_FILE, StopRow::into_record)?;
        let rows = stop_rows.len();
        let stops: Vec<Stop> = stop_rows.into_iter().flatten().collect();
        if stops.len() < rows {
            warn!(
                skipped = rows - stops.len(),
                "Skipped generic nodes and boarding areas without coordinates"
            );
        }

        let shapes_path = dir.join(SHAPES_FILE);
        let shape_points = if shapes_path.is_file() {
            read_file(&shapes_path, SHAPES_FILE, ShapeRow::into_record)?
        } else {
            debug!(dir = %dir.display(), "No shapes file, skipping shapes");
            Vec::new()
        };

        info!(
            dir = %dir.display(),
            routes = routes.len(),
            trips = trips.len(),
            stop_visits = stop_visits.len(),
            stops = stops.len(),
            shape_points = shape_points.len(),
            "Read feed"
        );

        Ok(Self {
            routes,
            stops,
            trips,
            stop_visits,
            shape_points,
        })
    }
}

fn read_required<R, T>(
    dir: &Path,
    file: &str,
    convert: impl Fn(R) -> Result<T, String>,
) -> Result<Vec<T>, FeedError>
where
    R: DeserializeOwned,
{
    let path = dir.join(file);
    if !path.is_file() {
        return Err(FeedError::MissingFile { path });
    }
    read_file(&path, file, convert)
}

fn read_file<R, T>(
    path: &Path,
    file: &str,
    convert: impl Fn(R) -> Result<T, String>,
) -> Result<Vec<T>, FeedError>
where
    R: DeserializeOwned,
{
    let reader = std::fs::File::open(path).map_err(|source| FeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_records(reader, file, convert)
}

/// Parse CSV rows of type `R` and convert each into a record.
///
/// `file` is only used to label errors.
pub(crate) fn read_records<Rd, R, T>(
    reader: Rd,
    file: &str,
    convert: impl Fn(R) -> Result<T, String>,
) -> Result<Vec<T>, FeedError>
where
    Rd: Read,
    R: DeserializeOwned,
{
    let csv_error = |source| FeedError::Csv {
        file: file.to_owned(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut rec = csv::StringRecord::new();
    let mut records = Vec::new();

    while reader.read_record(&mut rec).map_err(csv_error)? {
        let line = rec.position().map_or(0, |p| p.line());
        let row: R = rec.deserialize(Some(&headers)).map_err(csv_error)?;
        let record = convert(row).map_err(|reason| FeedError::InvalidRecord {
            file: file.to_owned(),
            line,
            reason,
        })?;
        records.push(record);
    }

    Ok(records)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    route_id: String,
    #[serde(default)]
    route_short_name: Option<String>,
    #[serde(default)]
    route_long_name: Option<String>,
}

impl RouteRow {
    fn into_record(self) -> Result<Route, String> {
        Ok(Route {
            id: RouteId::new(self.route_id).map_err(|e| e.to_string())?,
            short_name: non_empty(self.route_short_name),
            long_name: non_empty(self.route_long_name),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TripRow {
    trip_id: String,
    route_id: String,
    #[serde(default)]
    shape_id: Option<String>,
}

impl TripRow {
    fn into_record(self) -> Result<Trip, String> {
        let shape_id = non_empty(self.shape_id)
            .map(ShapeId::new)
            .transpose()
            .map_err(|e| e.to_string())?;
        Ok(Trip {
            id: TripId::new(self.trip_id).map_err(|e| e.to_string())?,
            route_id: RouteId::new(self.route_id).map_err(|e| e.to_string())?,
            shape_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StopTimeRow {
    trip_id: String,
    stop_id: String,
    stop_sequence: u32,
}

impl StopTimeRow {
    fn into_record(self) -> Result<StopVisit, String> {
        Ok(StopVisit {
            trip_id: TripId::new(self.trip_id).map_err(|e| e.to_string())?,
            stop_id: StopId::new(self.stop_id).map_err(|e| e.to_string())?,
            sequence: self.stop_sequence,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    #[serde(default)]
    stop_name: Option<String>,
    #[serde(default)]
    stop_lat: Option<f64>,
    #[serde(default)]
    stop_lon: Option<f64>,
    #[serde(default)]
    location_type: Option<u8>,
}

/// `location_type` of generic nodes (3) and boarding areas (4), which may
/// omit coordinates.
const UNLOCATED_TYPES: [u8; 2] = [3, 4];

impl StopRow {
    /// Convert to a stop, or `None` for a generic node or boarding area
    /// without coordinates.
    fn into_record(self) -> Result<Option<Stop>, String> {
        let id = StopId::new(self.stop_id).map_err(|e| e.to_string())?;
        let (Some(lat), Some(lon)) = (self.stop_lat, self.stop_lon) else {
            if self.location_type.is_some_and(|t| UNLOCATED_TYPES.contains(&t)) {
                debug!(stop = %id, "Skipping stop without coordinates");
                return Ok(None);
            }
            return Err(format!("stop {id} has no coordinates"));
        };
        Stop::new(id, self.stop_name.unwrap_or_default(), lat, lon)
            .map(Some)
            .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ShapeRow {
    shape_id: String,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: u32,
}

impl ShapeRow {
    fn into_record(self) -> Result<ShapePoint, String> {
        let shape_id = ShapeId::new(self.shape_id).map_err(|e| e.to_string())?;
        ShapePoint::new(
            shape_id,
            self.shape_pt_lat,
            self.shape_pt_lon,
            self.shape_pt_sequence,
        )
        .map_err(|e| e.to_string())
    }
}
