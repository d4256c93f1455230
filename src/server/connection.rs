// Connection module
// Serves one accepted TCP connection with the gateway service

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;

use crate::handler::Gateway;
use crate::http::GatewayBody;
use crate::logger::{self, AccessLogEntry};
use crate::server::ServerOptions;

/// Decrements the active connection count when the connection task ends
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept a connection, enforcing `max_connections`, and serve it on its own task.
///
/// The connection is registered with `graceful` so shutdown can wait for it.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    gateway: &Arc<Gateway>,
    options: &Arc<ServerOptions>,
    conn_counter: &Arc<AtomicUsize>,
    graceful: &GracefulShutdown,
) {
    // Increment first, then check, so two racing accepts can't both slip under the limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    let guard = ConnectionGuard(Arc::clone(conn_counter));

    if let Some(max_conn) = options.max_connections {
        if prev_count >= max_conn {
            tracing::warn!("max connections reached: {prev_count}/{max_conn}, rejecting {peer_addr}");
            drop(stream);
            return;
        }
    }

    tracing::trace!("accepted connection from {peer_addr}");

    let io = TokioIo::new(stream);
    let mut builder = http1::Builder::new();
    builder
        .keep_alive(options.keep_alive)
        .timer(TokioTimer::new())
        .header_read_timeout(options.header_read_timeout);

    let gateway = Arc::clone(gateway);
    let service_options = Arc::clone(options);
    let service = service_fn(move |req: Request<Incoming>| {
        let gateway = Arc::clone(&gateway);
        let options = Arc::clone(&service_options);
        async move {
            Ok::<_, Infallible>(handle_request(req, peer_addr, &gateway, &options).await)
        }
    });

    let conn = graceful.watch(builder.serve_connection(io, service));
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            logger::log_connection_error(&err);
        }
        drop(guard);
    });
}

/// Dispatch one request and write its access log line
async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    gateway: &Gateway,
    options: &ServerOptions,
) -> Response<GatewayBody> {
    let Some(format) = options.access_log_format.as_deref() else {
        return gateway.dispatch(req).await;
    };

    let started = Instant::now();
    let mut entry = AccessLogEntry::from_request(
        peer_addr,
        req.method(),
        req.uri(),
        req.version(),
        req.headers(),
    );

    let resp = gateway.dispatch(req).await;

    entry.status = resp.status().as_u16();
    entry.body_bytes = resp.body().size_hint().exact();
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    logger::log_access(&entry, format);

    resp
}
