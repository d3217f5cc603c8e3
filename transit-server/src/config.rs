//! Server configuration from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::feed::CacheConfig;
use crate::graph::SearchConfig;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_GTFS_DIR: &str = "data/gtfs";
const DEFAULT_DATABASE_PATH: &str = "transit.db";
const DEFAULT_STATIC_DIR: &str = "static";

/// Error from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {var}: {value:?} ({reason})")]
pub struct ConfigError {
    var: &'static str,
    value: String,
    reason: String,
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (`HOST`, `PORT`).
    pub addr: SocketAddr,

    /// Directory of GTFS text files (`GTFS_DIR`).
    pub gtfs_dir: PathBuf,

    /// SQLite database file (`DATABASE_PATH`).
    pub database_path: PathBuf,

    /// Directory served under `/static` (`STATIC_DIR`).
    pub static_dir: PathBuf,

    /// Path search settings (`SEARCH_TIMEOUT_MS`, `0` disables the deadline).
    pub search: SearchConfig,

    /// Lookup cache settings (`CACHE_TTL_SECS`).
    pub cache: CacheConfig,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_var(&lookup, "HOST", DEFAULT_HOST)?;
        let port = parse_var(&lookup, "PORT", DEFAULT_PORT)?;

        let timeout_ms: u64 = parse_var(&lookup, "SEARCH_TIMEOUT_MS", 2_000)?;
        let search = SearchConfig::new((timeout_ms > 0).then_some(timeout_ms));

        let ttl_secs: u64 = parse_var(&lookup, "CACHE_TTL_SECS", 300)?;
        let cache = CacheConfig {
            ttl: Duration::from_secs(ttl_secs),
            ..CacheConfig::default()
        };

        let path_var = |var: &str, default: &str| {
            lookup(var)
                .filter(|v| !v.is_empty())
                .map_or_else(|| PathBuf::from(default), PathBuf::from)
        };

        Ok(Self {
            addr: SocketAddr::new(host, port),
            gtfs_dir: path_var("GTFS_DIR", DEFAULT_GTFS_DIR),
            database_path: path_var("DATABASE_PATH", DEFAULT_DATABASE_PATH),
            static_dir: path_var("STATIC_DIR", DEFAULT_STATIC_DIR),
            search,
            cache,
        })
    }
}

/// Parse a variable, falling back to `default` when unset or empty.
fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
