// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    #[serde(rename = "static")]
    pub static_files: StaticConfig,
    /// Prefix routes keyed by name
    pub routes: BTreeMap<String, RouteConfig>,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            workers: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: true,
            access_log_format: "combined".to_string(),
        }
    }
}

/// Performance configuration, all durations in seconds unless noted
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    pub header_read_timeout: u64,
    pub max_connections: Option<u64>,
    /// Time allowed for an upstream to send response headers
    pub upstream_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            header_read_timeout: 30,
            max_connections: None,
            upstream_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            shutdown_timeout: 10,
        }
    }
}

/// Static file serving for the fallback route
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StaticConfig {
    pub root: PathBuf,
    pub index_files: Vec<String>,
    pub directory_listing: bool,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index_files: vec!["index.html".to_string()],
            directory_listing: true,
        }
    }
}

/// Route handler types
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    Proxy,
    Dir,
}

/// A single prefix route.
///
/// Kept flat (no tagged enum) so environment overrides such as
/// `GATEWAY_ROUTES__PDNS__ENABLED=false` go through the config crate's
/// string coercion.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RouteConfig {
    pub prefix: String,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    #[serde(default)]
    pub upstream: Option<String>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub preserve_host: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

impl RouteConfig {
    pub fn proxy(prefix: &str, upstream: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            route_type: RouteType::Proxy,
            upstream: Some(upstream.to_string()),
            dir: None,
            preserve_host: false,
            enabled: true,
        }
    }

    pub fn dir(prefix: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.to_string(),
            route_type: RouteType::Dir,
            upstream: None,
            dir: Some(dir.into()),
            preserve_host: false,
            enabled: true,
        }
    }
}

/// Routes shipped by default: the two upstreams the gateway fronts
pub fn default_routes() -> BTreeMap<String, RouteConfig> {
    let mut routes = BTreeMap::new();
    routes.insert(
        "pdns".to_string(),
        RouteConfig::proxy("/pdns/", "http://localhost:8081"),
    );
    routes.insert(
        "surl".to_string(),
        RouteConfig::proxy("/surl/", "http://localhost:8001"),
    );
    routes
}
