//! Route pattern compilation.
//!
//! # Responsibilities
//! - Normalize paths and prefixes (leading slash, no trailing slash)
//! - Split paths into segments
//! - Compile a pattern into an ordered list of [`Token`]s
//!
//! # Design Decisions
//! - Runs once per route at registration, never on the request path
//! - Malformed parameter names are setup-time errors

use crate::routing::error::RouterError;

/// Compiled unit of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal segment, compared verbatim.
    Static(String),
    /// Named placeholder, binds the request segment.
    Param(String),
}

/// Normalize a path: ensure a leading `/` and strip one trailing `/`
/// (root stays `/`).
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Split a path on `/`, trimming segments and dropping empty ones.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Check a parameter name against `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Compile a route pattern into tokens.
pub fn tokenize(pattern: &str) -> Result<Vec<Token>, RouterError> {
    let pathname = normalize_path(pattern);

    split_segments(&pathname)
        .into_iter()
        .map(|segment| match segment.strip_prefix(':') {
            Some("") => Err(RouterError::InvalidRoutePattern {
                pattern: pathname.clone(),
                reason: "empty param name".to_string(),
            }),
            Some(name) if !is_valid_param_name(name) => Err(RouterError::InvalidRoutePattern {
                pattern: pathname.clone(),
                reason: format!("bad param name \"{}\"", name),
            }),
            Some(name) => Ok(Token::Param(name.to_string())),
            None => Ok(Token::Static(segment.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("posts"), "/posts");
        assert_eq!(normalize_path("/posts/"), "/posts");
        assert_eq!(normalize_path("/posts/1"), "/posts/1");
    }

    #[test]
    fn test_split_collapses_slashes() {
        assert_eq!(split_segments("//posts///1/"), vec!["posts", "1"]);
        assert!(split_segments("/").is_empty());
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("/posts/:postId/views").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Static("posts".into()),
                Token::Param("postId".into()),
                Token::Static("views".into()),
            ]
        );

        assert!(tokenize("/").unwrap().is_empty());
        assert_eq!(tokenize("/:_id2").unwrap(), vec![Token::Param("_id2".into())]);
    }

    #[test]
    fn test_tokenize_rejects_bad_param_names() {
        for pattern in ["/posts/:", "/posts/:1id", "/posts/:post-id", "/:a.b"] {
            let err = tokenize(pattern).unwrap_err();
            assert!(
                matches!(err, RouterError::InvalidRoutePattern { .. }),
                "{} should be rejected",
                pattern
            );
        }
    }
}
