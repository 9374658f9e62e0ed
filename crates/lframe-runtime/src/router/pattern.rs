#![forbid(unsafe_code)]

//! Route patterns: `/`-delimited literal and `:name` segments.

use std::collections::BTreeMap;
use std::fmt;

/// Parameters bound by a match, keyed by name.
pub type RouteParams = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route pattern such as `/user/:id/posts`.
///
/// Empty segments are ignored on both the pattern and the path side, so
/// `/user/42/` and `//user/42` both match `/user/:id`, and `/` has no
/// segments at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

/// Non-empty segments of a path.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

impl RoutePattern {
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let segments = path_segments(pattern)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_owned()),
                None => Segment::Literal(segment.to_owned()),
            })
            .collect();
        Self {
            source: pattern.to_owned(),
            segments,
        }
    }

    /// The pattern as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Whether the pattern has no parameters.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.param_names().next().is_none()
    }

    /// Match `path` structurally: equal segment counts, equal literals, and
    /// every `:name` binds the segment at its position.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let mut params = RouteParams::new();
        let mut path = path_segments(path);
        for segment in &self.segments {
            let actual = path.next()?;
            match segment {
                Segment::Literal(expected) if expected != actual => return None,
                Segment::Literal(_) => {}
                Segment::Param(name) => {
                    params.insert(name.clone(), actual.to_owned());
                }
            }
        }
        if path.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for RoutePattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}
