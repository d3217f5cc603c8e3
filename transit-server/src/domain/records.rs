//! Validated feed records.
//!
//! These are the typed forms of the rows of a static feed. Construction goes
//! through the ingestion layer, which rejects rows that fail validation.

use super::ids::{RouteId, ShapeId, StopId, TripId};

/// Error returned when a stop or shape point has unusable coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinates ({lat}, {lon}): {reason}")]
pub struct InvalidCoordinates {
    lat: f64,
    lon: f64,
    reason: &'static str,
}

/// Check that a latitude/longitude pair is finite and in range.
pub fn check_coordinates(lat: f64, lon: f64) -> Result<(), InvalidCoordinates> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(InvalidCoordinates {
            lat,
            lon,
            reason: "must be finite",
        });
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(InvalidCoordinates {
            lat,
            lon,
            reason: "latitude must be within [-90, 90]",
        });
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(InvalidCoordinates {
            lat,
            lon,
            reason: "longitude must be within [-180, 180]",
        });
    }
    Ok(())
}

/// A named transit line.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
}

/// A place where vehicles pick up or drop off riders.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Stop {
    /// Create a stop, validating its coordinates.
    pub fn new(id: StopId, name: String, lat: f64, lon: f64) -> Result<Self, InvalidCoordinates> {
        check_coordinates(lat, lon)?;
        Ok(Self { id, name, lat, lon })
    }
}

/// One scheduled run of a vehicle, belonging to exactly one route.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: TripId,
    pub route_id: RouteId,
    pub shape_id: Option<ShapeId>,
}

/// One stop visited by one trip at an ordinal position.
///
/// Within a trip, `sequence` is authoritative: it need not be contiguous
/// and the rows need not arrive in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopVisit {
    pub trip_id: TripId,
    pub stop_id: StopId,
    pub sequence: u32,
}

/// One sample of a route polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePoint {
    pub shape_id: ShapeId,
    pub lat: f64,
    pub lon: f64,
    pub sequence: u32,
}

impl ShapePoint {
    /// Create a shape point, validating its coordinates.
    pub fn new(
        shape_id: ShapeId,
        lat: f64,
        lon: f64,
        sequence: u32,
    ) -> Result<Self, InvalidCoordinates> {
        check_coordinates(lat, lon)?;
        Ok(Self {
            shape_id,
            lat,
            lon,
            sequence,
        })
    }
}

/// A shape polyline: its points in sequence order.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub points: Vec<ShapePoint>,
}
