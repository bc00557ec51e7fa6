//! Route and prefix matching logic.
//!
//! # Responsibilities
//! - Match compiled route tokens against request path segments
//! - Match middleware prefixes against request paths
//!
//! # Design Decisions
//! - Exact segment count, no wildcards or optional segments
//! - Static segments are case-sensitive
//! - Prefixes match on segment boundaries only (`/api` never matches `/apiv2`)
//! - No regex, no backtracking

use std::collections::HashMap;

use crate::routing::pattern::{split_segments, Token};

/// Parameter values bound by a matched route.
pub type Params = HashMap<String, String>;

/// Percent-decode a URL component, keeping the raw input when it does not
/// decode to valid UTF-8.
pub fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// A request path decoded once: the segments route lookup sees and the
/// pathname prefix bindings are filtered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPath {
    pub pathname: String,
    pub segments: Vec<String>,
}

impl DecodedPath {
    /// Decode the segments of a normalized path and rebuild the pathname from
    /// them, so `/%70osts/1` and `/posts/1` resolve identically.
    pub fn new(normalized: &str) -> Self {
        let segments: Vec<String> = split_segments(normalized)
            .into_iter()
            .map(decode_component)
            .collect();
        let pathname = format!("/{}", segments.join("/"));
        Self { pathname, segments }
    }

    pub fn segment_refs(&self) -> Vec<&str> {
        self.segments.iter().map(String::as_str).collect()
    }
}

/// Match route tokens against already decoded path segments.
///
/// Returns the bound parameters, or `None` on the first length or static
/// mismatch.
pub fn match_tokens(tokens: &[Token], segments: &[&str]) -> Option<Params> {
    if tokens.len() != segments.len() {
        return None;
    }

    let mut params = Params::new();
    for (token, segment) in tokens.iter().zip(segments) {
        match token {
            Token::Static(value) => {
                if value != segment {
                    return None;
                }
            }
            Token::Param(name) => {
                params.insert(name.clone(), segment.to_string());
            }
        }
    }
    Some(params)
}

/// Segment-aligned path prefix check. Both sides must already be normalized.
pub fn path_starts_with(pathname: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match pathname.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
