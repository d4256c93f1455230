//! Route matching module
//!
//! Literal path-prefix matching on segment boundaries and prefix stripping.

use std::borrow::Cow;

/// Result of testing one prefix against a request path
#[derive(Debug, PartialEq, Eq)]
pub enum PrefixMatch<'a> {
    /// Prefix applies; carries the path with the prefix removed
    Matched(Cow<'a, str>),
    /// Path is the prefix minus its trailing slash (`/pdns` for `/pdns/`)
    MissingSlash,
    NoMatch,
}

/// Check if `path` falls under `prefix`.
///
/// `/pdns` matches `/pdns` and `/pdns/zones` but never `/pdnsx`.
pub fn match_prefix<'a>(prefix: &str, path: &'a str) -> PrefixMatch<'a> {
    if let Some(rest) = path.strip_prefix(prefix) {
        if prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/') {
            return PrefixMatch::Matched(normalize_remainder(rest));
        }
        return PrefixMatch::NoMatch;
    }

    match prefix.strip_suffix('/') {
        Some(bare) if !bare.is_empty() && path == bare => PrefixMatch::MissingSlash,
        _ => PrefixMatch::NoMatch,
    }
}

/// Strip `prefix` from `path`, the remainder always starts with `/`
#[cfg(test)]
fn strip_prefix<'a>(prefix: &str, path: &'a str) -> Option<Cow<'a, str>> {
    match match_prefix(prefix, path) {
        PrefixMatch::Matched(rest) => Some(rest),
        _ => None,
    }
}

fn normalize_remainder(rest: &str) -> Cow<'_, str> {
    if rest.starts_with('/') {
        Cow::Borrowed(rest)
    } else {
        Cow::Owned(format!("/{rest}"))
    }
}
