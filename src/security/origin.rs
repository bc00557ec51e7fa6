//! Request origin helpers shared by the CORS and referer policies.

use axum::http::{header, HeaderMap};
use url::Url;

/// Origin of the request: the `Origin` header, else the origin of `Referer`.
///
/// Returns `None` when neither is present or the referer is not an absolute
/// URL with a host.
pub fn request_origin(headers: &HeaderMap) -> Option<String> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());
    if let Some(origin) = origin {
        return Some(origin.to_string());
    }

    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    let origin = Url::parse(referer).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Hostname part of [`request_origin`].
pub fn request_hostname(headers: &HeaderMap) -> Option<String> {
    let origin = request_origin(headers)?;
    Url::parse(&origin).ok()?.host_str().map(str::to_string)
}

/// The origin itself when it is in the allow-list (exact match).
pub fn allowed_origin<'a>(origin: Option<&'a str>, allowed: &[String]) -> Option<&'a str> {
    origin.filter(|origin| allowed.iter().any(|candidate| candidate == origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_origin_header_wins() {
        let h = headers(&[
            ("origin", "https://a.example"),
            ("referer", "https://b.example/post/1"),
        ]);
        assert_eq!(request_origin(&h).as_deref(), Some("https://a.example"));
    }

    #[test]
    fn test_referer_fallback() {
        let h = headers(&[("referer", "http://localhost:3000/posts/1?x=y")]);
        assert_eq!(request_origin(&h).as_deref(), Some("http://localhost:3000"));
        assert_eq!(request_hostname(&h).as_deref(), Some("localhost"));

        assert_eq!(request_origin(&headers(&[("referer", "not a url")])), None);
        assert_eq!(request_origin(&HeaderMap::new()), None);
    }

    #[test]
    fn test_allowed_origin() {
        let allowed = vec!["https://a.example".to_string()];
        assert_eq!(
            allowed_origin(Some("https://a.example"), &allowed),
            Some("https://a.example")
        );
        assert_eq!(allowed_origin(Some("https://a.example:8443"), &allowed), None);
        assert_eq!(allowed_origin(None, &allowed), None);
    }
}
