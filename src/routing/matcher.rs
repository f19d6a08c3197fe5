//! Route matching logic.
//!
//! # Responsibilities
//! - Parse path patterns made of literal and `{param}` segments
//! - Match inbound paths segment by segment, binding parameters
//! - Match the request method against a route's allowed set
//! - Render backend path templates from bound parameters
//!
//! # Design Decisions
//! - Path matching is case-sensitive and exact per segment
//! - A single trailing slash is ignored
//! - Parameters bind the raw (still percent-encoded) inbound segment, so the
//!   backend receives exactly what the client sent
//! - No regex to guarantee O(n) matching

use axum::http::Method;
use thiserror::Error;

/// Problems found while parsing a pattern or template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern {0:?} must start with '/'")]
    MissingLeadingSlash(String),

    #[error("pattern {0:?} contains an empty segment")]
    EmptySegment(String),

    #[error("pattern {pattern:?} has malformed parameter segment {segment:?}")]
    BadParam { pattern: String, segment: String },

    #[error("pattern {pattern:?} binds {name:?} twice")]
    DuplicateParam { pattern: String, name: String },

    #[error("template {template:?} uses {name:?}, which the pattern does not bind")]
    UnknownTemplateParam { template: String, name: String },
}

/// Parameters bound by a successful path match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    /// Value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path pattern such as `/orders/user/{user_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let rest = raw
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(raw.to_string()))?;

        let mut segments = Vec::new();
        for segment in split_segments(rest) {
            if segment.is_empty() {
                return Err(PatternError::EmptySegment(raw.to_string()));
            }
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => {
                    if name.is_empty() || name.contains(['{', '}']) {
                        return Err(PatternError::BadParam {
                            pattern: raw.to_string(),
                            segment: segment.to_string(),
                        });
                    }
                    if segments.contains(&Segment::Param(name.to_string())) {
                        return Err(PatternError::DuplicateParam {
                            pattern: raw.to_string(),
                            name: name.to_string(),
                        });
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None if segment.contains(['{', '}']) => {
                    return Err(PatternError::BadParam {
                        pattern: raw.to_string(),
                        segment: segment.to_string(),
                    });
                }
                None => segments.push(Segment::Literal(segment.to_string())),
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match an inbound path, binding parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let mut inbound = split_segments(rest);
        let mut params = Vec::new();

        for segment in &self.segments {
            let value = inbound.next()?;
            match segment {
                Segment::Literal(expected) if expected == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if value.is_empty() => return None,
                Segment::Param(name) => params.push((name.clone(), value.to_string())),
            }
        }

        // Leftover inbound segments mean the path is longer than the pattern.
        if inbound.next().is_some() {
            return None;
        }
        Some(PathParams(params))
    }

    /// Number of literal segments; more specific patterns sort first.
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Pattern with parameter names erased. Two patterns with the same shape
    /// match exactly the same paths.
    pub fn shape(&self) -> String {
        let mut shape = String::new();
        for segment in &self.segments {
            shape.push('/');
            match segment {
                Segment::Literal(s) => shape.push_str(s),
                Segment::Param(_) => shape.push_str("{}"),
            }
        }
        if shape.is_empty() {
            shape.push('/');
        }
        shape
    }

    fn binds(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Param(p) if p == name))
    }

    /// Ensure every parameter used by `template` is bound by this pattern.
    pub fn check_template(&self, template: &str) -> Result<PathPattern, PatternError> {
        let compiled = PathPattern::parse(template)?;
        for segment in &compiled.segments {
            if let Segment::Param(name) = segment {
                if !self.binds(name) {
                    return Err(PatternError::UnknownTemplateParam {
                        template: template.to_string(),
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(compiled)
    }

    /// Render this pattern as a concrete path using bound parameters.
    /// Parameters missing from `params` render as empty segments.
    pub fn render(&self, params: &PathParams) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(s) => path.push_str(s),
                Segment::Param(name) => path.push_str(params.get(name).unwrap_or_default()),
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }
}

/// Split the part of a path after its leading slash, ignoring one trailing slash.
fn split_segments(rest: &str) -> impl Iterator<Item = &str> {
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    let empty = rest.is_empty();
    rest.split('/').filter(move |_| !empty)
}

/// The set of methods a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMatcher {
    allowed: Vec<Method>,
}

impl MethodMatcher {
    pub fn new(allowed: Vec<Method>) -> Self {
        Self { allowed }
    }

    pub fn matches(&self, method: &Method) -> bool {
        self.allowed.contains(method)
    }

    pub fn allowed(&self) -> &[Method] {
        &self.allowed
    }
}
