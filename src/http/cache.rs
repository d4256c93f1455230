//! HTTP cache validators module
//!
//! `ETag`/`Last-Modified` generation from file metadata and conditional
//! request evaluation (`If-None-Match` beats `If-Modified-Since`).

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Validators for one file version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    pub etag: String,
    /// Seconds since the epoch, `None` if the platform gives no mtime
    pub modified: Option<i64>,
}

impl Validators {
    /// Weak enough for static files: size and mtime change with content
    pub fn from_metadata(len: u64, modified: Option<SystemTime>) -> Self {
        let modified = modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| i64::try_from(d.as_secs()).ok());
        let etag = format!("\"{len:x}-{:x}\"", modified.unwrap_or(0));
        Self { etag, modified }
    }

    /// `Last-Modified` header value in IMF-fixdate form
    pub fn last_modified(&self) -> Option<String> {
        self.modified
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }

    /// True if the client's cached copy is current (answer 304)
    pub fn is_not_modified(&self, if_none_match: Option<&str>, if_modified_since: Option<&str>) -> bool {
        if let Some(tags) = if_none_match {
            return tags
                .split(',')
                .map(str::trim)
                .any(|tag| tag == "*" || tag == self.etag || tag.strip_prefix("W/") == Some(self.etag.as_str()));
        }

        match (if_modified_since, self.modified) {
            (Some(since), Some(modified)) => DateTime::parse_from_rfc2822(since)
                .is_ok_and(|since| modified <= since.timestamp()),
            _ => false,
        }
    }
}
