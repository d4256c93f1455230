//! Routing module
//!
//! Maps request paths to routes:
//! - Literal prefix matching on path segment boundaries
//! - Longest prefix first, static root as fallback
//! - Upstream address parsing for proxy routes

mod matcher;
mod table;

pub use matcher::{match_prefix, PrefixMatch};
pub use table::{
    ProxyTarget, Route, RouteKind, RouteTable, Selection, StaticRoot, UpstreamTarget,
    FALLBACK_ROUTE,
};
