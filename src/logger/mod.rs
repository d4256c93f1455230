//! Logger module
//!
//! Provides logging for the gateway:
//! - `tracing` subscriber initialisation (`RUST_LOG` overrides `logging.level`)
//! - Server lifecycle logging
//! - Access logging with multiple formats on the `access` target

mod format;

pub use format::AccessLogEntry;

use crate::config::Config;
use crate::routing::RouteTable;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Target used for access log lines, e.g. `RUST_LOG=access=off`
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber with configuration
///
/// Should be called once at application startup. A second call is a no-op,
/// which keeps tests that share a process from failing.
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, table: &RouteTable) {
    tracing::info!("gateway listening on http://{addr}");
    if let Some(workers) = config.server.workers {
        tracing::info!("worker threads: {workers}");
    }
    for route in table.routes() {
        tracing::info!("route {} {} -> {}", route.name, route.prefix, route.kind);
    }
    let fallback = table.fallback();
    tracing::info!("fallback {} -> {}", fallback.prefix, fallback.kind);
}

/// Connection errors caused by the client going away are routine
pub fn log_connection_error(err: &hyper::Error) {
    if err.is_incomplete_message() || err.is_canceled() || err.is_closed() {
        tracing::debug!("client connection closed early: {err}");
    } else {
        tracing::warn!("failed to serve connection: {err}");
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
