//! Query string and cookie header decoding.
//!
//! Both inputs go through the same pipeline: split into `key=value` pieces,
//! order them according to [`DuplicateKeys`], percent-decode, drop pieces with
//! a missing or empty value, and fold into a map.
//!
//! The value of a piece is the text between its first and second `=`; anything
//! after a second `=` is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::routing::matcher::decode_component;

/// Decoded query string.
pub type QueryMap = HashMap<String, String>;

/// Decoded cookie header.
pub type CookieMap = HashMap<String, String>;

/// Tie-break for keys that occur more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeys {
    /// Sort the raw pieces lexically, then the last one wins. `a=1&a=2` and
    /// `a=2&a=1` both decode to `a = "2"`.
    #[default]
    SortedLast,
    /// Last occurrence in original order wins.
    Last,
    /// First occurrence in original order wins.
    First,
}

/// Decode a raw query string (with or without the leading `?`).
pub fn parse_query(raw: &str, policy: DuplicateKeys) -> QueryMap {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    if raw.is_empty() {
        return QueryMap::new();
    }
    fold_pairs(raw.split('&'), policy)
}

/// Decode a raw `Cookie` header value.
pub fn parse_cookie(raw: &str, policy: DuplicateKeys) -> CookieMap {
    if raw.is_empty() {
        return CookieMap::new();
    }
    let stripped = raw.replace(';', "");
    fold_pairs(stripped.split(' '), policy)
}

fn fold_pairs<'a>(pieces: impl Iterator<Item = &'a str>, policy: DuplicateKeys) -> HashMap<String, String> {
    let mut pieces: Vec<&str> = pieces.collect();
    if policy == DuplicateKeys::SortedLast {
        pieces.sort_unstable();
    }

    let mut map = HashMap::new();
    for piece in pieces {
        let mut parts = piece.split('=');
        let key = decode_component(parts.next().unwrap_or_default());
        let value = match parts.next() {
            Some(v) if !v.is_empty() => decode_component(v),
            _ => continue,
        };
        if value.is_empty() {
            continue;
        }

        if policy == DuplicateKeys::First {
            map.entry(key).or_insert(value);
        } else {
            map.insert(key, value);
        }
    }
    map
}
