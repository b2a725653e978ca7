//! # Strata Router
//!
//! Directory-convention routing:
//! - A directory is a route iff it directly contains `index.html`
//! - Directory names prefixed with `_` become named parameters (`users/_id`)
//! - Every other directory name must match literally
//! - The top-level `index.html` serves the empty path and is never in the table
//! - The reserved `_error` directory holds error pages, not routes
//!
//! ## Ordering
//!
//! Filesystem enumeration order is not stable across platforms, so the table
//! is sorted explicitly: literal segments win over parameters at the first
//! depth where two routes differ, then shallower routes, then lexicographic
//! source path. First match wins.
//!
//! ## Concurrency
//!
//! [`Dispatcher`] publishes [`RouteTable`] snapshots through `arc-swap`.
//! A rebuild scans into a fresh table and swaps it in; readers never see a
//! half-built table.
//!
//! ## Example
//!
//! ```
//! use strata_router::{Route, RouteTable};
//!
//! let table = RouteTable::from_routes(vec![
//!     Route::from_dir("routes", "routes/users/_id", "index.server.json").unwrap(),
//!     Route::from_dir("routes", "routes/users/new", "index.server.json").unwrap(),
//! ]);
//!
//! let m = table.match_path("users/new").unwrap();
//! assert_eq!(m.route.source, "users/new");
//!
//! let m = table.match_path("users/123").unwrap();
//! assert_eq!(m.params.get("id"), Some(&"123".to_string()));
//! ```

use std::collections::HashMap;

mod dispatcher;
pub mod path;
pub mod route;
mod table;

pub use dispatcher::{Dispatcher, Resolution};
pub use path::normalize_path;
pub use route::{classify_segment, PatternSegment, Route, PARAM_MARKER};
pub use table::{RouteMatch, RouteTable, ScanOptions};

/// Page file that makes a directory a route
pub const PAGE_FILE: &str = "index.html";

/// Reserved directory (directly under the routes root) holding error pages
pub const ERROR_DIR: &str = "_error";

/// Captured parameter values keyed by name
pub type Params = HashMap<String, String>;

/// Hook file name for a given extension (`json` → `index.server.json`)
pub fn hook_file_name(extension: &str) -> String {
    format!("index.server.{}", extension.trim_start_matches('.'))
}
