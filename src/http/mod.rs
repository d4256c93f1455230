//! HTTP protocol layer module
//!
//! Protocol helpers shared by static file serving and the reverse proxy,
//! decoupled from routing decisions.

pub mod body;
pub mod cache;
pub mod headers;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::GatewayBody;
pub use range::parse_range_header;
pub use response::{
    build_304_response, build_404_response, build_405_response, build_416_response,
    build_error_response, build_options_response, build_redirect_response,
};
