//! Shared helpers for the gateway integration tests.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use frontdoor::config::RouteConfig;
use frontdoor::{Config, Gateway, Server, ServerHandle, ServerOptions};

pub type TestClient = Client<HttpConnector, Full<Bytes>>;

/// Start an upstream that echoes what it received.
///
/// The method, path with query, and `Host` come back as `x-echo-*` headers
/// and the request body is returned as the response body. `/teapot` answers 418.
pub async fn start_echo_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let service = service_fn(echo);
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

async fn echo(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await.map(|c| c.to_bytes()).unwrap_or_default();

    let status = if parts.uri.path() == "/teapot" {
        StatusCode::IM_A_TEAPOT
    } else {
        StatusCode::OK
    };
    let path = parts
        .uri
        .path_and_query()
        .map_or_else(|| "/".to_string(), ToString::to_string);
    let host = parts
        .headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let resp = Response::builder()
        .status(status)
        .header("x-echo-method", parts.method.as_str())
        .header("x-echo-path", path)
        .header("x-echo-host", host)
        .header("x-echo-secret", parts.headers.contains_key("x-secret").to_string())
        .body(Full::new(body))
        .unwrap();
    Ok(resp)
}

/// Configuration with the static root at `root` and both default prefixes
/// pointed at the given upstreams
pub fn gateway_config(root: &Path, pdns: SocketAddr, surl: SocketAddr) -> Config {
    let mut cfg = Config::builtin();
    cfg.static_files.root = root.to_path_buf();
    cfg.performance.upstream_timeout_ms = 2_000;
    cfg.performance.connect_timeout_ms = 1_000;
    cfg.routes
        .insert("pdns".to_string(), RouteConfig::proxy("/pdns/", &format!("http://{pdns}")));
    cfg.routes
        .insert("surl".to_string(), RouteConfig::proxy("/surl/", &format!("http://{surl}")));
    cfg
}

pub fn start_gateway(cfg: &Config) -> ServerHandle {
    let gateway = Arc::new(Gateway::new(cfg).unwrap());
    let mut options = ServerOptions::from_config(cfg);
    options.access_log_format = None;
    Server::start("127.0.0.1:0".parse().unwrap(), gateway, options).unwrap()
}

pub fn client() -> TestClient {
    Client::builder(TokioExecutor::new()).build_http()
}

/// Send a request and collect the response body
pub async fn send(client: &TestClient, req: Request<Full<Bytes>>) -> (Response<()>, Bytes) {
    let resp = client.request(req).await.unwrap();
    let (parts, body) = resp.into_parts();
    let body = body.collect().await.unwrap().to_bytes();
    (Response::from_parts(parts, ()), body)
}

pub fn get(addr: SocketAddr, path: &str) -> Request<Full<Bytes>> {
    Request::get(format!("http://{addr}{path}"))
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// A local port with nothing listening on it
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Signals from an upstream that accepts one request and never answers
pub struct StalledUpstream {
    pub addr: SocketAddr,
    /// Fires once the request has arrived
    pub received: oneshot::Receiver<()>,
    /// Fires when the gateway closes the upstream connection
    pub closed: oneshot::Receiver<()>,
}

pub async fn start_stalled_upstream() -> StalledUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (received_tx, received) = oneshot::channel();
    let (closed_tx, closed) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        read_request_head(&mut stream).await;
        let _ = received_tx.send(());

        let mut buf = [0u8; 1024];
        while let Ok(n) = stream.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
        let _ = closed_tx.send(());
    });

    StalledUpstream {
        addr,
        received,
        closed,
    }
}

/// Start an upstream that sends a chunked response: `first` right away,
/// then `second` and the terminating chunk once `release` fires
pub async fn start_chunked_upstream(release: oneshot::Receiver<()>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        read_request_head(&mut stream).await;

        let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nfirst\r\n";
        if stream.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let _ = release.await;
        let _ = stream.write_all(b"6\r\nsecond\r\n0\r\n\r\n").await;
        let _ = stream.flush().await;
    });

    addr
}

async fn read_request_head(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}
