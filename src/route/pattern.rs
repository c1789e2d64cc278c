//! Route patterns derived from page file paths.
//!
//! ```text
//! index.tsx              ->  /
//! about.tsx              ->  /about
//! docs/index.tsx         ->  /docs
//! docs/[id].tsx          ->  /docs/:id
//! files/[...path].tsx    ->  /files/*
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Page source extensions, stripped when deriving patterns.
pub const SOURCE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

/// Parameter key holding the remainder captured by a catch-all segment.
pub const WILDCARD_KEY: &str = "*";

/// Captured route parameters, keyed by name (`*` for the catch-all).
pub type Params = BTreeMap<String, String>;

/// Check whether a relative path names a page source file.
///
/// Hidden files and TypeScript declaration files are never pages.
pub fn is_page_source(relative: &str) -> bool {
    let name = relative.rsplit('/').next().unwrap_or(relative);
    if name.starts_with('.') || name.ends_with(".d.ts") {
        return false;
    }
    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && SOURCE_EXTENSIONS.contains(&ext))
}

/// Derive a URL pattern from a page path relative to the pages directory.
///
/// Idempotent: feeding a derived pattern back in yields the same pattern.
pub fn derive_pattern(relative: &str) -> String {
    let normalized = relative.replace('\\', "/");
    let mut without_ext = normalized.as_str();
    // Strip every trailing source extension so `x.js.tsx` and `/x` agree
    while let Some((stem, ext)) = without_ext.rsplit_once('.') {
        if !SOURCE_EXTENSIONS.contains(&ext) || stem.is_empty() || stem.ends_with('/') {
            break;
        }
        without_ext = stem;
    }

    let mut segments: Vec<String> = without_ext
        .split('/')
        .filter(|s| !s.is_empty())
        .map(convert_segment)
        .collect();

    // `index` names its parent directory; repeat so `index/index` collapses too
    while segments.last().is_some_and(|s| s == "index") {
        segments.pop();
    }

    format!("/{}", segments.join("/"))
}

/// `[...name]` -> `*`, `[name]` -> `:name`, anything else unchanged.
fn convert_segment(segment: &str) -> String {
    match segment
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    {
        Some(inner) => match inner.strip_prefix("...") {
            Some(_) => WILDCARD_KEY.to_string(),
            None if !inner.is_empty() => format!(":{inner}"),
            None => segment.to_string(),
        },
        None => segment.to_string(),
    }
}

/// One segment of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Static(String),
    Param(String),
    Wildcard,
}

impl Segment {
    /// Lower ranks are more specific.
    fn rank(segment: Option<&Self>) -> u8 {
        match segment {
            Some(Self::Static(_)) => 0,
            Some(Self::Param(_)) => 1,
            None => 2,
            Some(Self::Wildcard) => 3,
        }
    }
}

/// A parsed route pattern such as `/docs/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a pattern string (`/`, `/about`, `/docs/:id`, `/files/*`).
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == WILDCARD_KEY {
                    Segment::Wildcard
                } else if let Some(name) = s.strip_prefix(':').filter(|n| !n.is_empty()) {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Static(s.to_string())
                }
            })
            .collect::<Vec<_>>();

        let raw = format!(
            "/{}",
            raw.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/")
        );
        Self { raw, segments }
    }

    /// Parse the pattern for a page file path relative to the pages directory.
    pub fn from_relative(relative: &str) -> Self {
        Self::parse(&derive_pattern(relative))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[inline]
    /// The pattern with parameter names erased, so `/docs/:id` and
    /// `/docs/:slug` share the shape `/docs/:`.
    pub fn shape(&self) -> String {
        let parts: Vec<&str> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Static(s) => s.as_str(),
                Segment::Param(_) => ":",
                Segment::Wildcard => WILDCARD_KEY,
            })
            .collect();
        format!("/{}", parts.join("/"))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match decoded path segments, returning captured params on success.
    ///
    /// A catch-all matches zero or more segments; its capture is the
    /// matched segments joined with `/`.
    pub fn matches(&self, path: &[String]) -> Option<Params> {
        let mut params = Params::new();
        match_from(&self.segments, path, &mut params).then_some(params)
    }

    /// Concrete path for captured params: the URL the pattern matched.
    pub fn resolve(&self, params: &Params) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Static(s) => parts.push(s),
                Segment::Param(name) => {
                    if let Some(v) = params.get(name) {
                        parts.push(v);
                    }
                }
                Segment::Wildcard => {
                    if let Some(v) = params.get(WILDCARD_KEY).filter(|v| !v.is_empty()) {
                        parts.push(v);
                    }
                }
            }
        }
        format!("/{}", parts.join("/"))
    }

    /// Order by specificity: static before param before catch-all,
    /// compared segment by segment from the left.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = Segment::rank(self.segments.get(i));
            let b = Segment::rank(other.segments.get(i));
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

fn match_from(segments: &[Segment], path: &[String], params: &mut Params) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return path.is_empty();
    };

    match first {
        Segment::Static(s) => match path.split_first() {
            Some((head, tail)) if head == s => match_from(rest, tail, params),
            _ => false,
        },
        Segment::Param(name) => match path.split_first() {
            Some((head, tail)) if match_from(rest, tail, params) => {
                params.insert(name.clone(), head.clone());
                true
            }
            _ => false,
        },
        Segment::Wildcard => {
            // Greedy: prefer the longest capture that lets the tail match
            for take in (0..=path.len()).rev() {
                if match_from(rest, &path[take..], params) {
                    params.insert(WILDCARD_KEY.to_string(), path[..take].join("/"));
                    return true;
                }
            }
            false
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Pattern> for String {
    fn from(p: Pattern) -> Self {
        p.raw
    }
}
