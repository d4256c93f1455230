//! Route table
//!
//! Immutable set of prefix routes built once from configuration. Proxy
//! upstreams are parsed and static roots resolved here, so every problem
//! surfaces at startup.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use hyper::Uri;

use super::matcher::{match_prefix, PrefixMatch};
use crate::config::{Config, RouteType};
use crate::error::GatewayError;

/// Name used for the catch-all static route
pub const FALLBACK_ROUTE: &str = "static";

/// Parsed upstream address: `http://host[:port][/base]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    scheme: String,
    host: String,
    port: u16,
    /// Authority as configured, used for the `Host` header
    authority: String,
    /// Path prefix on the upstream without trailing slash, often empty
    base_path: String,
}

impl UpstreamTarget {
    pub fn parse(url: &str) -> Result<Self, String> {
        let uri: Uri = url.trim().parse().map_err(|e| format!("{e}"))?;

        let scheme = uri.scheme_str().ok_or("missing scheme")?;
        if scheme != "http" {
            return Err(format!("unsupported scheme '{scheme}', only http is supported"));
        }
        let authority = uri.authority().ok_or("missing host")?;
        if authority.as_str().contains('@') {
            return Err("credentials in upstream URLs are not supported".to_string());
        }
        let host = authority.host();
        if host.is_empty() {
            return Err("missing host".to_string());
        }
        if uri.query().is_some() || url.contains('#') {
            return Err("upstream URL must not carry a query or fragment".to_string());
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port: authority.port_u16().unwrap_or(80),
            authority: authority.as_str().to_string(),
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Absolute URI for a forwarded request, `path` must start with `/`
    pub fn request_uri(&self, path: &str, query: Option<&str>) -> Result<Uri, hyper::http::Error> {
        let mut path_and_query = format!("{}{path}", self.base_path);
        if let Some(q) = query {
            path_and_query.push('?');
            path_and_query.push_str(q);
        }
        Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.base_path)
    }
}

#[derive(Debug, Clone)]
pub struct ProxyTarget {
    pub upstream: UpstreamTarget,
    /// Forward the client's `Host` instead of the upstream authority
    pub preserve_host: bool,
}

/// Directory served by a static route
#[derive(Debug, Clone)]
pub struct StaticRoot {
    /// Canonical path, used for containment checks
    pub root: PathBuf,
    pub index_files: Vec<String>,
    pub listing: bool,
}

impl StaticRoot {
    /// Resolve `dir`; it has to exist and be a directory
    pub fn open(dir: &Path, index_files: Vec<String>, listing: bool) -> Result<Self, GatewayError> {
        let missing = |reason: String| GatewayError::MissingStaticRoot {
            path: dir.to_path_buf(),
            reason,
        };
        let root = dir.canonicalize().map_err(|e| missing(e.to_string()))?;
        if !root.is_dir() {
            return Err(missing("not a directory".to_string()));
        }
        Ok(Self {
            root,
            index_files,
            listing,
        })
    }
}

#[derive(Debug, Clone)]
pub enum RouteKind {
    Proxy(ProxyTarget),
    StaticFiles(StaticRoot),
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proxy(target) => write!(f, "proxy {}", target.upstream),
            Self::StaticFiles(dir) => write!(f, "static {}", dir.root.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub prefix: String,
    pub kind: RouteKind,
}

/// Outcome of routing one request path
#[derive(Debug)]
pub enum Selection<'a> {
    Route {
        route: &'a Route,
        /// Path seen by the handler, prefix removed, always starts with `/`
        remainder: Cow<'a, str>,
    },
    /// Subtree requested without its trailing slash; carries the corrected path
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    /// Longest prefix first
    routes: Vec<Route>,
    fallback: Route,
}

impl RouteTable {
    pub fn new(mut routes: Vec<Route>, fallback: StaticRoot) -> Self {
        routes.sort_by(|a, b| {
            b.prefix
                .len()
                .cmp(&a.prefix.len())
                .then_with(|| a.prefix.cmp(&b.prefix))
        });
        Self {
            routes,
            fallback: Route {
                name: FALLBACK_ROUTE.to_string(),
                prefix: "/".to_string(),
                kind: RouteKind::StaticFiles(fallback),
            },
        }
    }

    /// Build from validated configuration
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let statics = &config.static_files;
        let fallback = StaticRoot::open(
            &statics.root,
            statics.index_files.clone(),
            statics.directory_listing,
        )?;

        let mut routes = Vec::new();
        for (name, route) in config.enabled_routes() {
            let kind = match route.route_type {
                RouteType::Proxy => {
                    let url = route.upstream.as_deref().unwrap_or_default();
                    let upstream = UpstreamTarget::parse(url).map_err(|reason| {
                        GatewayError::InvalidUpstream {
                            route: name.clone(),
                            url: url.to_string(),
                            reason,
                        }
                    })?;
                    RouteKind::Proxy(ProxyTarget {
                        upstream,
                        preserve_host: route.preserve_host,
                    })
                }
                RouteType::Dir => {
                    let dir = route.dir.clone().unwrap_or_default();
                    RouteKind::StaticFiles(StaticRoot::open(
                        &dir,
                        statics.index_files.clone(),
                        statics.directory_listing,
                    )?)
                }
            };
            routes.push(Route {
                name: name.clone(),
                prefix: route.prefix.clone(),
                kind,
            });
        }

        Ok(Self::new(routes, fallback))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub const fn fallback(&self) -> &Route {
        &self.fallback
    }

    /// Pick the route for `path`; falls back to the static root
    pub fn select<'a>(&'a self, path: &'a str) -> Selection<'a> {
        let mut redirect = None;
        for route in &self.routes {
            match match_prefix(&route.prefix, path) {
                PrefixMatch::Matched(remainder) => return Selection::Route { route, remainder },
                PrefixMatch::MissingSlash if redirect.is_none() => {
                    redirect = Some(format!("{path}/"));
                }
                _ => {}
            }
        }

        if let Some(location) = redirect {
            return Selection::Redirect(location);
        }

        let remainder = if path.is_empty() {
            Cow::Borrowed("/")
        } else {
            Cow::Borrowed(path)
        };
        Selection::Route {
            route: &self.fallback,
            remainder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    fn proxy(name: &str, prefix: &str, url: &str) -> Route {
        Route {
            name: name.to_string(),
            prefix: prefix.to_string(),
            kind: RouteKind::Proxy(ProxyTarget {
                upstream: UpstreamTarget::parse(url).unwrap(),
                preserve_host: false,
            }),
        }
    }

    fn table(routes: Vec<Route>) -> RouteTable {
        let root = StaticRoot::open(&std::env::temp_dir(), vec![], false).unwrap();
        RouteTable::new(routes, root)
    }

    fn selected(table: &RouteTable, path: &str) -> (String, String) {
        match table.select(path) {
            Selection::Route { route, remainder } => (route.name.clone(), remainder.into_owned()),
            Selection::Redirect(location) => ("redirect".to_string(), location),
        }
    }

    #[test]
    fn test_parse_upstream() {
        let target = UpstreamTarget::parse("http://localhost:8081").unwrap();
        assert_eq!(target.host(), "localhost");
        assert_eq!(target.port(), 8081);
        assert_eq!(target.authority(), "localhost:8081");
        assert_eq!(target.to_string(), "http://localhost:8081");
    }

    #[test]
    fn test_parse_upstream_default_port_and_base_path() {
        let target = UpstreamTarget::parse("http://backend/api/").unwrap();
        assert_eq!(target.port(), 80);
        assert_eq!(target.authority(), "backend");
        assert_eq!(
            target.request_uri("/zones", Some("a=1")).unwrap().to_string(),
            "http://backend/api/zones?a=1"
        );
    }

    #[test]
    fn test_parse_upstream_rejects_malformed() {
        assert!(UpstreamTarget::parse("localhost:8081").is_err());
        assert!(UpstreamTarget::parse("https://localhost:8443").is_err());
        assert!(UpstreamTarget::parse("http://user:pw@localhost").is_err());
        assert!(UpstreamTarget::parse("http://localhost:8081/?x=1").is_err());
        assert!(UpstreamTarget::parse("http://localhost:8081/#top").is_err());
        assert!(UpstreamTarget::parse("http://local host").is_err());
        assert!(UpstreamTarget::parse("").is_err());
    }

    #[test]
    fn test_request_uri_keeps_query_verbatim() {
        let target = UpstreamTarget::parse("http://127.0.0.1:8001").unwrap();
        let uri = target.request_uri("/abc", Some("x=1&y=%20z")).unwrap();
        assert_eq!(uri.path(), "/abc");
        assert_eq!(uri.query(), Some("x=1&y=%20z"));
    }

    #[test]
    fn test_select_proxy_routes() {
        let t = table(vec![
            proxy("pdns", "/pdns/", "http://localhost:8081"),
            proxy("surl", "/surl/", "http://localhost:8001"),
        ]);
        assert_eq!(selected(&t, "/pdns/zones"), ("pdns".into(), "/zones".into()));
        assert_eq!(selected(&t, "/surl/abc"), ("surl".into(), "/abc".into()));
        assert_eq!(selected(&t, "/surl/"), ("surl".into(), "/".into()));
    }

    #[test]
    fn test_select_falls_back_to_static() {
        let t = table(vec![proxy("pdns", "/pdns/", "http://localhost:8081")]);
        assert_eq!(
            selected(&t, "/index.html"),
            (FALLBACK_ROUTE.into(), "/index.html".into())
        );
        assert_eq!(
            selected(&t, "/pdnsx/zones"),
            (FALLBACK_ROUTE.into(), "/pdnsx/zones".into())
        );
    }

    #[test]
    fn test_select_longest_prefix_wins() {
        let t = table(vec![
            proxy("api", "/api/", "http://a:1"),
            proxy("api-v2", "/api/v2/", "http://b:2"),
        ]);
        assert_eq!(selected(&t, "/api/v2/users"), ("api-v2".into(), "/users".into()));
        assert_eq!(selected(&t, "/api/v1/users"), ("api".into(), "/v1/users".into()));
    }

    #[test]
    fn test_select_redirects_bare_subtree() {
        let t = table(vec![proxy("pdns", "/pdns/", "http://localhost:8081")]);
        assert_eq!(selected(&t, "/pdns"), ("redirect".into(), "/pdns/".into()));
    }

    #[test]
    fn test_from_config_reports_bad_upstream() {
        let mut cfg = Config::default();
        cfg.static_files.root = std::env::temp_dir();
        cfg.routes
            .insert("pdns".to_string(), RouteConfig::proxy("/pdns/", "localhost:8081"));
        let err = RouteTable::from_config(&cfg).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidUpstream { ref route, .. } if route == "pdns"));
    }

    #[test]
    fn test_from_config_requires_static_root() {
        let mut cfg = Config::builtin();
        cfg.static_files.root = PathBuf::from("/nonexistent/frontdoor-root");
        assert!(matches!(
            RouteTable::from_config(&cfg),
            Err(GatewayError::MissingStaticRoot { .. })
        ));
    }

    #[test]
    fn test_from_config_skips_disabled_routes() {
        let mut cfg = Config::builtin();
        cfg.static_files.root = std::env::temp_dir();
        if let Some(route) = cfg.routes.get_mut("surl") {
            route.enabled = false;
        }
        let t = RouteTable::from_config(&cfg).unwrap();
        let names: Vec<_> = t.routes().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["pdns"]);
    }
}
