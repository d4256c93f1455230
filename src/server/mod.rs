//! Server module
//!
//! Owns the listener and the accept loop. `Server::start` binds and returns a
//! `ServerHandle`; `ServerHandle::shutdown` stops accepting and drains
//! in-flight connections.

pub mod connection;
pub mod listener;
pub mod signal;

pub use listener::create_listener;
pub use signal::shutdown_signal;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::GatewayError;
use crate::handler::Gateway;

/// Pause after a failed `accept` (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Per-connection settings derived from configuration
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub keep_alive: bool,
    pub header_read_timeout: Duration,
    pub max_connections: Option<usize>,
    /// Access log format; `None` disables access logging
    pub access_log_format: Option<String>,
}

impl ServerOptions {
    pub fn from_config(config: &Config) -> Self {
        let performance = &config.performance;
        Self {
            keep_alive: performance.keep_alive,
            header_read_timeout: Duration::from_secs(performance.header_read_timeout),
            max_connections: performance
                .max_connections
                .map(|max| usize::try_from(max).unwrap_or(usize::MAX)),
            access_log_format: config
                .logging
                .access_log
                .then(|| config.logging.access_log_format.clone()),
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&Config::builtin())
    }
}

pub struct Server;

impl Server {
    /// Bind `addr` and start accepting connections on a background task.
    ///
    /// Must be called inside a Tokio runtime. Port 0 binds an ephemeral port;
    /// see [`ServerHandle::local_addr`].
    pub fn start(
        addr: SocketAddr,
        gateway: Arc<Gateway>,
        options: ServerOptions,
    ) -> Result<ServerHandle, GatewayError> {
        let listener =
            create_listener(addr).map_err(|source| GatewayError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(accept_loop(
            listener,
            gateway,
            Arc::new(options),
            shutdown_rx,
        ));

        Ok(ServerHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }
}

/// A running server. Dropping the handle also closes the listener.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<GracefulShutdown>,
}

impl ServerHandle {
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, then wait up to `drain` for in-flight connections.
    ///
    /// Returns `false` if connections were still open when `drain` ran out;
    /// those are dropped along with their upstream calls.
    pub async fn shutdown(self, drain: Duration) -> bool {
        let _ = self.shutdown_tx.send(true);

        let graceful = match self.task.await {
            Ok(graceful) => graceful,
            Err(err) => {
                tracing::error!("accept loop failed: {err}");
                return false;
            }
        };

        if tokio::time::timeout(drain, graceful.shutdown()).await.is_ok() {
            tracing::info!("all connections drained");
            true
        } else {
            tracing::warn!("drain timeout of {drain:?} elapsed, dropping open connections");
            false
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    gateway: Arc<Gateway>,
    options: Arc<ServerOptions>,
    mut shutdown: watch::Receiver<bool>,
) -> GracefulShutdown {
    let graceful = GracefulShutdown::new();
    let conn_counter = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => connection::accept_connection(
                    stream,
                    peer_addr,
                    &gateway,
                    &options,
                    &conn_counter,
                    &graceful,
                ),
                Err(err) => {
                    tracing::error!("failed to accept connection: {err}");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            // Fires on an explicit shutdown and when the handle is dropped
            _ = shutdown.changed() => break,
        }
    }

    drop(listener);
    tracing::info!(
        "listener closed, {} connection(s) in flight",
        conn_counter.load(Ordering::SeqCst)
    );
    graceful
}
