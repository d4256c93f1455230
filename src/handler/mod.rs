//! Request handler module
//!
//! Dispatches each request to the reverse proxy or the static file server.

pub mod proxy;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::Gateway;
