//! Pattern parsing for route directory segments
//!
//! Pure functional parsing of directory names into typed segments, and
//! compilation of a segment list into an anchored matcher.
use regex::Regex;

/// Prefix marking a directory name as a named parameter (`_id` → `id`)
pub const PARAM_MARKER: char = '_';

/// Represents the two kinds of route pattern segments
///
/// # Examples
///
/// ```
/// use strata_router::route::pattern::{classify_segment, PatternSegment};
///
/// assert_eq!(classify_segment("about"), PatternSegment::Literal("about".into()));
/// assert_eq!(classify_segment("_id"), PatternSegment::Param("id".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    /// Segment that must match the path segment byte for byte
    Literal(String),
    /// Named capture matching any non-empty, slash-free segment
    Param(String),
}

impl PatternSegment {
    pub fn is_param(&self) -> bool {
        matches!(self, PatternSegment::Param(_))
    }

    /// Regex fragment for this segment
    fn to_regex(&self) -> String {
        match self {
            PatternSegment::Literal(text) => regex::escape(text),
            PatternSegment::Param(_) => "([^/]+)".to_string(),
        }
    }
}

/// Classifies a directory name into a pattern segment (pure function)
pub fn classify_segment(segment: &str) -> PatternSegment {
    match segment.strip_prefix(PARAM_MARKER) {
        Some(name) => PatternSegment::Param(name.to_string()),
        None => PatternSegment::Literal(segment.to_string()),
    }
}

/// Compiles segments into a matcher anchored at both ends
///
/// Segments are joined with `/`, so the matcher accepts a normalized path
/// with exactly `segments.len()` components.
pub fn compile(segments: &[PatternSegment]) -> Result<Regex, regex::Error> {
    let body = segments
        .iter()
        .map(PatternSegment::to_regex)
        .collect::<Vec<_>>()
        .join("/");

    Regex::new(&format!("^{}$", body))
}
