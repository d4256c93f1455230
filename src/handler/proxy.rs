//! Reverse proxy module
//!
//! Forwards a request to a route's upstream and streams the answer back.
//! One pooled client is shared by every proxy route.

use std::time::Duration;

use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, HOST};
use hyper::{Request, Response, Version};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::PerformanceConfig;
use crate::error::{BoxError, ProxyError};
use crate::http::headers::strip_hop_by_hop;
use crate::http::{build_error_response, GatewayBody};
use crate::routing::ProxyTarget;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const TCP_KEEPALIVE: Duration = Duration::from_secs(60);

/// HTTP client used for all upstream calls
#[derive(Clone)]
pub struct ProxyClient {
    client: Client<HttpConnector, GatewayBody>,
    /// Deadline for the upstream's response head
    timeout: Duration,
}

impl ProxyClient {
    pub fn new(performance: &PerformanceConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.set_keepalive(Some(TCP_KEEPALIVE));
        connector.set_connect_timeout(Some(performance.connect_timeout()));

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .set_host(false)
            .build(connector);

        Self {
            client,
            timeout: performance.upstream_timeout(),
        }
    }

    /// Forward `req` to the route's upstream with `path` as the new path.
    ///
    /// Never fails: upstream errors become 502/504 responses.
    pub async fn forward<B>(
        &self,
        route: &str,
        target: &ProxyTarget,
        path: &str,
        req: Request<B>,
    ) -> Response<GatewayBody>
    where
        B: Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        match self.try_forward(target, path, req).await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(route, "{err}");
                build_error_response(err.status())
            }
        }
    }

    async fn try_forward<B>(
        &self,
        target: &ProxyTarget,
        path: &str,
        req: Request<B>,
    ) -> Result<Response<GatewayBody>, ProxyError>
    where
        B: Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        let (mut parts, body) = req.into_parts();
        let uri = target.upstream.request_uri(path, parts.uri.query())?;

        let client_host = parts.headers.remove(HOST);
        strip_hop_by_hop(&mut parts.headers);
        let host = match client_host {
            Some(host) if target.preserve_host => host,
            _ => HeaderValue::from_str(target.upstream.authority())
                .map_err(hyper::http::Error::from)?,
        };
        parts.headers.insert(HOST, host);

        tracing::debug!(
            method = %parts.method,
            upstream = %uri,
            "forwarding request"
        );

        let mut forward = Request::new(body.map_err(Into::<BoxError>::into).boxed());
        *forward.method_mut() = parts.method;
        *forward.uri_mut() = uri;
        *forward.version_mut() = Version::HTTP_11;
        *forward.headers_mut() = parts.headers;

        let upstream = || target.upstream.authority().to_string();
        let resp = match tokio::time::timeout(self.timeout, self.client.request(forward)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(source)) => {
                return Err(ProxyError::Unavailable {
                    upstream: upstream(),
                    source,
                })
            }
            Err(_) => {
                return Err(ProxyError::Timeout {
                    upstream: upstream(),
                    timeout: self.timeout,
                })
            }
        };

        let (mut parts, body) = resp.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        tracing::debug!(status = %parts.status, "upstream responded");
        Ok(Response::from_parts(
            parts,
            body.map_err(Into::<BoxError>::into).boxed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::body::full;
    use crate::routing::UpstreamTarget;
    use hyper::StatusCode;

    fn target(url: &str) -> ProxyTarget {
        ProxyTarget {
            upstream: UpstreamTarget::parse(url).unwrap(),
            preserve_host: false,
        }
    }

    fn client(timeout_ms: u64) -> ProxyClient {
        let performance = PerformanceConfig {
            upstream_timeout_ms: timeout_ms,
            connect_timeout_ms: timeout_ms,
            ..PerformanceConfig::default()
        };
        ProxyClient::new(&performance)
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let req = Request::get("/pdns/zones").body(full("")).unwrap();
        let resp = client(2_000)
            .forward("pdns", &target(&format!("http://{addr}")), "/zones", req)
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_stalled_upstream_is_gateway_timeout() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stall = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let req = Request::get("/pdns/slow").body(full("")).unwrap();
        let resp = client(200)
            .forward("pdns", &target(&format!("http://{addr}")), "/slow", req)
            .await;
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        stall.abort();
    }
}
