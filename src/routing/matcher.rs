//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse patterns like `/api/v1/users/:id` into segments
//! - Match a request path segment by segment
//! - Bind `:name` segments to the matched path text
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Trailing slashes are significant (`/users/` is not `/users`)
//! - No regex to guarantee O(n) matching

use std::fmt;

use crate::routing::RouteError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern. It must start with `/`; `:name` segments need a
    /// non-empty name that is unique within the pattern.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let rest = pattern
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with `/`"))?;

        let mut segments = Vec::new();
        for part in split(rest) {
            let segment = match part.strip_prefix(':') {
                Some("") => return Err(invalid("parameter name is empty")),
                Some(name) => {
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(n) if n == name))
                    {
                        return Err(invalid("parameter name is repeated"));
                    }
                    Segment::Param(name.to_string())
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// Match `path`, returning the bound parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let mut parts = split(rest);
        let mut params = PathParams::default();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(expected) if expected == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => params.0.push((name.clone(), part.to_string())),
            }
        }

        parts.next().is_none().then_some(params)
    }

    /// Number of `:name` segments.
    pub fn param_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Param(_)))
            .count()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// `/` alone has no segments; otherwise every `/`-separated part counts.
fn split(rest: &str) -> impl Iterator<Item = &str> {
    (!rest.is_empty())
        .then(|| rest.split('/'))
        .into_iter()
        .flatten()
}

/// Parameters bound by a successful match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
