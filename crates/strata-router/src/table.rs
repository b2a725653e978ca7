//! Route table construction from a directory scan

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{Params, Route, ERROR_DIR, PAGE_FILE};

/// Where and how to scan for routes
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Routes root directory
    pub routes_root: PathBuf,
    /// Name of the optional per-route hook file (e.g. `index.server.json`)
    pub hook_file: String,
}

impl ScanOptions {
    pub fn new(routes_root: impl Into<PathBuf>, hook_file: impl Into<String>) -> Self {
        Self {
            routes_root: routes_root.into(),
            hook_file: hook_file.into(),
        }
    }
}

/// Result of matching a path against a table
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Params,
}

/// Ordered, immutable list of routes built from one directory scan
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Builds a table from already compiled routes, applying priority order
    pub fn from_routes(mut routes: Vec<Route>) -> Self {
        routes.sort_by(|a, b| a.cmp_priority(b));
        Self { routes }
    }

    /// Scans the routes root and compiles every qualifying directory
    ///
    /// A directory qualifies iff it directly contains `index.html`. The root
    /// itself and the reserved `_error` subtree are skipped. Unreadable
    /// entries are logged and ignored; a missing root yields an empty table.
    pub fn scan(options: &ScanOptions) -> Self {
        let root = options.routes_root.as_path();

        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "routes root missing, route table is empty");
            return Self::default();
        }

        let routes = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_error_dir(root, entry.path()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable routes entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .filter(|entry| entry.path().join(PAGE_FILE).is_file())
            .filter_map(|entry| Route::from_dir(root, entry.path(), &options.hook_file))
            .collect();

        Self::from_routes(routes)
    }

    /// Returns the first route (in priority order) matching a normalized path
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .find_map(|route| route.matches(path).map(|params| RouteMatch { route, params }))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn is_error_dir(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .map(|rel| rel == Path::new(ERROR_DIR))
        .unwrap_or(false)
}
