//! Error types
//!
//! `GatewayError` covers everything that can go wrong while building the
//! gateway from configuration. Those errors are fatal at startup.
//! `ProxyError` covers a single forwarded request and is always translated
//! into an HTTP response by the proxy handler.

use hyper::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Boxed error used for request and response bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Startup/configuration errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("route '{route}': invalid upstream '{url}': {reason}")]
    InvalidUpstream {
        route: String,
        url: String,
        reason: String,
    },

    #[error("static root '{}' is not an accessible directory: {reason}", path.display())]
    MissingStaticRoot { path: PathBuf, reason: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-request upstream errors
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream {upstream} unavailable: {source}")]
    Unavailable {
        upstream: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("upstream {upstream} did not respond within {}ms", timeout.as_millis())]
    Timeout { upstream: String, timeout: Duration },

    #[error("could not build upstream request: {0}")]
    Request(#[from] hyper::http::Error),
}

impl ProxyError {
    /// Status code reported to the client
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unavailable { .. } | Self::Request(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}
