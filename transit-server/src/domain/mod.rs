//! Domain types for the transit feed.
//!
//! This module contains the typed records of a static transit feed. All
//! types enforce their invariants at construction time, so code that
//! receives these types can trust their validity.

mod ids;
mod records;

pub use ids::{InvalidId, RouteId, ShapeId, StopId, TripId};
pub use records::{
    InvalidCoordinates, Route, Shape, ShapePoint, Stop, StopVisit, Trip, check_coordinates,
};
