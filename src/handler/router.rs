//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: selects the route for the
//! request path and hands the request to the proxy or static handler.

use hyper::body::{Body, Bytes};
use hyper::{Request, Response};

use crate::config::{Config, PerformanceConfig};
use crate::error::{BoxError, GatewayError};
use crate::handler::proxy::ProxyClient;
use crate::handler::static_files::{self, RequestContext};
use crate::http::{self, GatewayBody};
use crate::routing::{RouteKind, RouteTable, Selection};

/// The gateway router: owns the route table and the upstream client
pub struct Gateway {
    routes: RouteTable,
    proxy: ProxyClient,
}

impl Gateway {
    /// Build from configuration; fails on bad upstreams or a missing static root
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let routes = RouteTable::from_config(config)?;
        Ok(Self::with_routes(routes, &config.performance))
    }

    pub fn with_routes(routes: RouteTable, performance: &PerformanceConfig) -> Self {
        Self {
            routes,
            proxy: ProxyClient::new(performance),
        }
    }

    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Route one request and produce its response.
    ///
    /// Per-request failures are turned into responses here; nothing escapes.
    pub async fn dispatch<B>(&self, req: Request<B>) -> Response<GatewayBody>
    where
        B: Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        let path = req.uri().path().to_string();

        match self.routes.select(&path) {
            Selection::Redirect(location) => {
                let location = match req.uri().query() {
                    Some(q) => format!("{location}?{q}"),
                    None => location,
                };
                http::build_redirect_response(&location)
            }
            Selection::Route { route, remainder } => match &route.kind {
                RouteKind::Proxy(target) => {
                    self.proxy
                        .forward(&route.name, target, &remainder, req)
                        .await
                }
                RouteKind::StaticFiles(root) => {
                    let ctx = RequestContext::new(
                        req.method(),
                        &path,
                        req.uri().query(),
                        req.headers(),
                    );
                    static_files::serve(root, &remainder, &ctx).await
                }
            },
        }
    }
}
