// Configuration module entry point
// Layers compiled defaults, an optional TOML file and GATEWAY_* environment variables

mod types;

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::GatewayError;

pub use types::{
    default_routes, Config, LoggingConfig, PerformanceConfig, RouteConfig, RouteType,
    ServerConfig, StaticConfig,
};

/// Config file looked up when no path is given (extension resolved by the config crate)
pub const DEFAULT_CONFIG_FILE: &str = "config";

/// Environment variable prefix, e.g. `GATEWAY_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "GATEWAY";

impl Config {
    /// Built-in configuration: the default server settings plus the stock routes
    pub fn builtin() -> Self {
        Self {
            routes: default_routes(),
            ..Self::default()
        }
    }

    /// Load configuration.
    ///
    /// With `None` the default `config.toml` is used when present. An explicit
    /// path must exist.
    pub fn load(config_path: Option<&str>) -> Result<Self, GatewayError> {
        let file = match config_path {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::builtin())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Structural checks that do not touch the network or filesystem
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.logging.access_log_format.trim().is_empty() {
            return Err(GatewayError::Invalid(
                "logging.access_log_format must not be empty".to_string(),
            ));
        }
        if self.performance.upstream_timeout_ms == 0 {
            return Err(GatewayError::Invalid(
                "performance.upstream_timeout_ms must be greater than zero".to_string(),
            ));
        }

        let mut prefixes = HashSet::new();
        for (name, route) in self.enabled_routes() {
            if !route.prefix.starts_with('/') {
                return Err(GatewayError::Invalid(format!(
                    "route '{name}': prefix '{}' must start with '/'",
                    route.prefix
                )));
            }
            if !prefixes.insert(route.prefix.as_str()) {
                return Err(GatewayError::Invalid(format!(
                    "route '{name}': prefix '{}' is registered twice",
                    route.prefix
                )));
            }
            match route.route_type {
                RouteType::Proxy if route.upstream.is_none() => {
                    return Err(GatewayError::Invalid(format!(
                        "route '{name}': proxy routes need an 'upstream'"
                    )));
                }
                RouteType::Dir if route.dir.is_none() => {
                    return Err(GatewayError::Invalid(format!(
                        "route '{name}': dir routes need a 'dir'"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Routes that are switched on, in name order
    pub fn enabled_routes(&self) -> impl Iterator<Item = (&String, &RouteConfig)> {
        self.routes.iter().filter(|(_, route)| route.enabled)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, GatewayError> {
        let ip: IpAddr = self.server.host.parse().map_err(|e| {
            GatewayError::Invalid(format!("invalid server.host '{}': {e}", self.server.host))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

impl PerformanceConfig {
    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, PoisonError};

    /// Environment variables are process-wide; loads that read them run one at a time
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_builtin_routes() {
        let cfg = Config::builtin();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.routes["pdns"].prefix, "/pdns/");
        assert_eq!(
            cfg.routes["pdns"].upstream.as_deref(),
            Some("http://localhost:8081")
        );
        assert_eq!(
            cfg.routes["surl"].upstream.as_deref(),
            Some("http://localhost:8001")
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[routes.pdns]
upstream = "http://10.0.0.5:8081"

[routes.surl]
enabled = false

[routes.docs]
prefix = "/docs/"
type = "dir"
dir = "/srv/docs"
"#
        )
        .unwrap();

        let _env = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let cfg = Config::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.routes["pdns"].prefix, "/pdns/");
        assert_eq!(
            cfg.routes["pdns"].upstream.as_deref(),
            Some("http://10.0.0.5:8081")
        );
        let enabled: Vec<_> = cfg.enabled_routes().map(|(name, _)| name.as_str()).collect();
        assert_eq!(enabled, vec!["docs", "pdns"]);
    }

    #[test]
    fn test_environment_overrides() {
        let vars = [
            ("GATEWAY_SERVER__PORT", "9123"),
            ("GATEWAY_ROUTES__SURL__ENABLED", "false"),
            ("GATEWAY_ROUTES__PDNS__UPSTREAM", "http://10.0.0.5:8081"),
            ("GATEWAY_ROUTES__ENVAPI__PREFIX", "/envapi/"),
            ("GATEWAY_ROUTES__ENVAPI__TYPE", "proxy"),
            ("GATEWAY_ROUTES__ENVAPI__UPSTREAM", "http://127.0.0.1:9000"),
        ];

        let _env = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let loaded = Config::load(None);
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let cfg = loaded.unwrap();
        assert_eq!(cfg.server.port, 9123);
        assert!(!cfg.routes["surl"].enabled);
        assert_eq!(
            cfg.routes["pdns"].upstream.as_deref(),
            Some("http://10.0.0.5:8081")
        );
        assert_eq!(cfg.routes["envapi"].prefix, "/envapi/");
        assert_eq!(cfg.routes["envapi"].route_type, RouteType::Proxy);

        let enabled: Vec<_> = cfg.enabled_routes().map(|(name, _)| name.as_str()).collect();
        assert_eq!(enabled, vec!["envapi", "pdns"]);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        assert!(Config::load(Some("/nonexistent/frontdoor-config")).is_err());
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let mut cfg = Config::builtin();
        cfg.routes
            .insert("again".to_string(), RouteConfig::proxy("/pdns/", "http://a:1"));
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("registered twice"));
    }

    #[test]
    fn test_prefix_must_be_absolute() {
        let mut cfg = Config::default();
        cfg.routes
            .insert("bad".to_string(), RouteConfig::proxy("api/", "http://a:1"));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_proxy_route_requires_upstream() {
        let mut cfg = Config::default();
        let mut route = RouteConfig::proxy("/api/", "http://a:1");
        route.upstream = None;
        cfg.routes.insert("api".to_string(), route);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::default();
        cfg.server.host = "127.0.0.1".to_string();
        cfg.server.port = 8000;
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "127.0.0.1:8000");

        cfg.server.host = "::1".to_string();
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "[::1]:8000");

        cfg.server.host = "localhost:80".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
