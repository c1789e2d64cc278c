//! Request path type for route matching.
//!
//! - Internal representation: decoded segments (human-readable)
//! - Browser boundary: split first, then decode each segment, so an encoded
//!   `%2F` never introduces a new segment

use std::sync::Arc;

use percent_encoding::percent_decode_str;

/// Decoded request path.
///
/// Invariants:
/// - `path` always starts with `/` and never ends with `/` (except root)
/// - Empty segments (`//`, trailing `/`) are dropped
/// - Query string and fragment are stripped
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestPath {
    /// Request target as received (encoded, with query), for client routers.
    target: Arc<str>,
    /// Decoded path joined with `/`.
    path: Arc<str>,
    segments: Arc<[String]>,
}

impl RequestPath {
    /// Create from a browser request target (`/docs/a%20b?x=1`).
    pub fn from_browser(target: &str) -> Self {
        let trimmed = target.trim();
        let path = Self::strip_query_fragment(trimmed);

        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                percent_decode_str(s)
                    .decode_utf8()
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .collect();

        let joined = format!("/{}", segments.join("/"));
        let target = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };

        Self {
            target: Arc::from(target),
            path: Arc::from(joined),
            segments: Arc::from(segments),
        }
    }

    /// Strip query string and fragment.
    fn strip_query_fragment(path: &str) -> &str {
        path.split(['?', '#']).next().unwrap_or(path)
    }

    /// Decoded path, `/` for the root.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Request target as the browser sent it.
    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Decoded, non-empty path segments.
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Check if this is the root path.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check if path starts with the given prefix.
    #[inline]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.path.starts_with(prefix)
    }
}

impl std::fmt::Display for RequestPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl Default for RequestPath {
    fn default() -> Self {
        Self::from_browser("/")
    }
}

impl From<&str> for RequestPath {
    fn from(s: &str) -> Self {
        Self::from_browser(s)
    }
}

impl AsRef<str> for RequestPath {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        for raw in ["/", "", "//", "/?x=1", "/#top"] {
            let p = RequestPath::from_browser(raw);
            assert_eq!(p.as_str(), "/", "{raw:?}");
            assert!(p.is_root());
        }
    }

    #[test]
    fn test_trailing_slash_tolerated() {
        assert_eq!(RequestPath::from_browser("/about/").as_str(), "/about");
        assert_eq!(RequestPath::from_browser("/about").as_str(), "/about");
    }

    #[test]
    fn test_decoding_per_segment() {
        let p = RequestPath::from_browser("/docs/a%20b/c%2Fd?q=1");
        assert_eq!(p.segments(), &["docs", "a b", "c/d"]);
        assert_eq!(p.target(), "/docs/a%20b/c%2Fd?q=1");
    }

    #[test]
    fn test_invalid_utf8_kept_encoded() {
        let p = RequestPath::from_browser("/x/%FF");
        assert_eq!(p.segments()[1], "%FF");
    }
}
