use std::error::Error;

use tracing::info;
use tracing_subscriber::EnvFilter;

use transit_server::config::ServerConfig;
use transit_server::feed::{CachedFeed, FeedStore};
use transit_server::graph::SharedGraph;
use transit_server::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Open the store and load the feed on first run
    let store = FeedStore::open(&config.database_path)?;
    let feed = CachedFeed::new(store, &config.cache);
    if let Some(counts) = feed.import_if_empty(config.gtfs_dir.clone()).await? {
        info!(
            routes = counts.routes,
            stops = counts.stops,
            trips = counts.trips,
            stop_visits = counts.stop_visits,
            "Imported feed"
        );
    }

    let graph = feed.build_graph().await?;
    info!(
        stops = graph.stop_count(),
        edges = graph.edge_count(),
        "Built transit graph"
    );
    let graph = SharedGraph::new(graph);

    let state = AppState::new(feed, graph, config.search, config.gtfs_dir);
    let app = create_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %listener.local_addr()?, "Transit server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
