//! frontdoor: a path-prefix HTTP gateway.
//!
//! Requests whose path starts with a configured prefix are proxied to that
//! route's upstream (or served from its directory); everything else is served
//! as a static file from the fallback root.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use config::Config;
pub use error::GatewayError;
pub use handler::Gateway;
pub use server::{Server, ServerHandle, ServerOptions};
