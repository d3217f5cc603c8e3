//! Web layer for the transit server.
//!
//! Provides HTTP endpoints for feed lookups, path finding and feed reload.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, Reloaded};
