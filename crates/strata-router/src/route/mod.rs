//! Route module for directory-based routing
//!
//! A [`Route`] is compiled once from a qualifying directory and never
//! mutated afterwards; rebuilding the table produces fresh routes.
pub mod pattern;

use regex::Regex;
use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

use crate::Params;
pub use pattern::{classify_segment, PatternSegment, PARAM_MARKER};

/// A compiled route: matcher plus the files that back it
#[derive(Debug, Clone)]
pub struct Route {
    /// Directory path relative to the routes root, `/`-separated (e.g. `users/_id`)
    pub source: String,
    /// Parsed segments, one per directory level
    pub segments: Vec<PatternSegment>,
    /// Parameter names in capture order
    pub param_names: Vec<String>,
    /// Page template (`<dir>/index.html`)
    pub page_path: PathBuf,
    /// Hook file; may not exist, checked at render time
    pub hook_path: PathBuf,
    /// Source directory
    pub dir: PathBuf,
    matcher: Regex,
}

impl Route {
    /// Compiles a route from a directory under `routes_root`
    ///
    /// Returns `None` for the routes root itself (the top-level page is
    /// resolved by the dispatcher) and for directories outside the root.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_router::Route;
    ///
    /// let route = Route::from_dir("routes", "routes/users/_id", "index.server.json").unwrap();
    /// assert_eq!(route.source, "users/_id");
    /// assert_eq!(route.param_names, vec!["id"]);
    /// assert!(route.matches("users/7").is_some());
    /// ```
    pub fn from_dir(
        routes_root: impl AsRef<Path>,
        dir: impl AsRef<Path>,
        hook_file: &str,
    ) -> Option<Self> {
        let dir = dir.as_ref();
        let relative = dir.strip_prefix(routes_root.as_ref()).ok()?;

        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            return None;
        }

        let segments: Vec<PatternSegment> = parts.iter().map(|p| classify_segment(p)).collect();
        let param_names = segments
            .iter()
            .filter_map(|s| match s {
                PatternSegment::Param(name) => Some(name.clone()),
                PatternSegment::Literal(_) => None,
            })
            .collect();

        let matcher = match pattern::compile(&segments) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping route with uncompilable pattern");
                return None;
            }
        };

        Some(Route {
            source: parts.join("/"),
            segments,
            param_names,
            page_path: dir.join(crate::PAGE_FILE),
            hook_path: dir.join(hook_file),
            dir: dir.to_path_buf(),
            matcher,
        })
    }

    /// Matches a normalized path, returning the captured parameters
    pub fn matches(&self, path: &str) -> Option<Params> {
        let caps = self.matcher.captures(path)?;

        Some(
            self.param_names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }

    /// The anchored regex source, e.g. `^users/([^/]+)$`
    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    /// Total match-priority order
    ///
    /// At the first depth where one route is literal and the other a
    /// parameter, the literal route comes first. Remaining ties go to the
    /// shallower route, then to the lexicographically smaller source.
    pub fn cmp_priority(&self, other: &Route) -> Ordering {
        self.segments
            .iter()
            .zip(&other.segments)
            .find_map(|(a, b)| match (a.is_param(), b.is_param()) {
                (false, true) => Some(Ordering::Less),
                (true, false) => Some(Ordering::Greater),
                _ => None,
            })
            .unwrap_or_else(|| {
                self.segments
                    .len()
                    .cmp(&other.segments.len())
                    .then_with(|| self.source.cmp(&other.source))
            })
    }
}
