//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::domain::{InvalidId, RouteId, StopId};
use crate::feed::FeedError;
use crate::graph::{PathFinder, SearchError};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router(state: AppState, static_dir: impl AsRef<std::path::Path>) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .route("/routes", get(list_routes))
        .route("/routes/:id/stops", get(route_stops))
        .route("/routes/:id/shapes", get(route_shapes))
        .route("/stops/:id/routes", get(stop_routes))
        .route("/path", get(find_path))
        .route("/graph", get(graph_info))
        .route("/feed/reload", post(reload_feed))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Welcome message.
async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to server".to_string(),
    })
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// List all routes.
async fn list_routes(State(state): State<AppState>) -> Result<Json<Vec<RouteResult>>, AppError> {
    let routes = state.feed.routes().await?;
    Ok(Json(routes.iter().map(RouteResult::from_route).collect()))
}

/// List the distinct stops of a route.
async fn route_stops(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StopResult>>, AppError> {
    let route = known_route(&state, id).await?;
    let stops = state.feed.stops_for_route(&route).await?;
    Ok(Json(stops.iter().map(StopResult::from_stop).collect()))
}

/// List the shape polylines of a route.
async fn route_shapes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ShapeResult>>, AppError> {
    let route = known_route(&state, id).await?;
    let shapes = state.feed.shapes_for_route(&route).await?;
    Ok(Json(shapes.iter().map(ShapeResult::from_shape).collect()))
}

/// Parse a route id and check the route exists.
async fn known_route(state: &AppState, id: String) -> Result<RouteId, AppError> {
    let route = RouteId::new(id).map_err(AppError::invalid("route"))?;
    if state.feed.route(&route).await?.is_none() {
        return Err(AppError::NotFound {
            message: format!("Route {route} not found"),
        });
    }
    Ok(route)
}

/// List the routes departing a stop.
///
/// A known stop with no departures has an empty list.
async fn stop_routes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StopRoutesResponse>, AppError> {
    let stop = StopId::new(id).map_err(AppError::invalid("stop"))?;
    if state.feed.stop(&stop).await?.is_none() {
        return Err(AppError::NotFound {
            message: format!("Stop {stop} not found"),
        });
    }
    let snapshot = state.graph.current().await;
    let routes = snapshot.graph.routes_from(stop.as_str());
    Ok(Json(StopRoutesResponse::new(&stop, routes)))
}

/// Find the path with the fewest hops between two stops.
async fn find_path(
    State(state): State<AppState>,
    Query(req): Query<PathRequest>,
) -> Result<Json<PathResponse>, AppError> {
    let origin = required_stop("origin", req.origin)?;
    let destination = required_stop("destination", req.destination)?;

    let snapshot = state.graph.current().await;
    let version = snapshot.version;
    let config = state.search.clone();

    // The search is CPU-bound; keep it off the async workers.
    let (from, to) = (origin.clone(), destination.clone());
    let path = tokio::task::spawn_blocking(move || {
        PathFinder::new(&snapshot.graph, &config).find(&from, &to)
    })
    .await
    .map_err(|e| AppError::Internal {
        message: format!("Search task failed: {e}"),
    })??;

    Ok(Json(PathResponse::from_path(
        &origin,
        &destination,
        &path,
        version,
    )))
}

/// Parse a required stop id query parameter.
fn required_stop(name: &str, value: Option<String>) -> Result<StopId, AppError> {
    let value = value.ok_or_else(|| AppError::BadRequest {
        message: format!("Missing {name} stop"),
    })?;
    StopId::new(value).map_err(|_| AppError::BadRequest {
        message: format!("Missing {name} stop"),
    })
}

/// Summary of the current graph.
async fn graph_info(State(state): State<AppState>) -> Json<GraphResponse> {
    let snapshot = state.graph.current().await;
    Json(GraphResponse::from_snapshot(&snapshot))
}

/// Reload the feed from disk and publish a new graph.
async fn reload_feed(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let reloaded = state.reload().await?;
    Ok(Json(ReloadResponse::new(
        reloaded.counts,
        reloaded.graph_version,
        reloaded.edges,
    )))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Unavailable { message: String },
    Internal { message: String },
}

impl AppError {
    /// Map an id parse failure to a bad request naming what was invalid.
    fn invalid(what: &'static str) -> impl Fn(InvalidId) -> AppError {
        move |e| AppError::BadRequest {
            message: format!("Invalid {what}: {e}"),
        }
    }
}

impl From<FeedError> for AppError {
    fn from(e: FeedError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::NotFound { .. } => AppError::NotFound {
                message: e.to_string(),
            },
            SearchError::Timeout { .. } => AppError::Unavailable {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "Request failed");
        } else {
            warn!(%status, %message, "Request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
