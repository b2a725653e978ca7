//! Request dispatch over an atomically published route table
//!
//! The table is rebuilt off to the side and swapped in whole, so every
//! reader observes exactly one scan's worth of routes.

use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::path::normalize_path;
use crate::{Params, RouteTable, ScanOptions, PAGE_FILE};

/// Everything the renderer needs to serve a dispatched request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub page_path: PathBuf,
    pub hook_path: PathBuf,
    pub params: Params,
    /// Normalized request path; addresses the cache entry
    pub route_key: String,
}

/// Matches request paths against the currently published [`RouteTable`]
#[derive(Debug)]
pub struct Dispatcher {
    options: ScanOptions,
    table: ArcSwap<RouteTable>,
}

impl Dispatcher {
    /// Scans the routes root and publishes the first table
    pub fn new(options: ScanOptions) -> Self {
        let table = RouteTable::scan(&options);
        tracing::debug!(routes = table.len(), "route table built");

        Self {
            options,
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Dispatcher over a prebuilt table
    pub fn with_table(options: ScanOptions, table: RouteTable) -> Self {
        Self {
            options,
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Rescans and atomically replaces the published table
    ///
    /// Returns the number of routes in the new table.
    pub fn rebuild(&self) -> usize {
        let table = RouteTable::scan(&self.options);
        let count = table.len();
        self.publish(table);
        count
    }

    /// Atomically replaces the published table
    pub fn publish(&self, table: RouteTable) {
        self.table.store(Arc::new(table));
    }

    /// The current table; stays valid even if a rebuild publishes a new one
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Resolves a raw request path
    ///
    /// The empty path (after trimming slashes) always maps to the top-level
    /// `index.html` without consulting the table.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_router::{Dispatcher, RouteTable, ScanOptions};
    ///
    /// let dispatcher = Dispatcher::with_table(
    ///     ScanOptions::new("routes", "index.server.json"),
    ///     RouteTable::default(),
    /// );
    /// let root = dispatcher.resolve("/").unwrap();
    /// assert_eq!(root.route_key, "");
    /// assert!(root.params.is_empty());
    /// assert!(dispatcher.resolve("/missing").is_none());
    /// ```
    pub fn resolve(&self, path: &str) -> Option<Resolution> {
        let key = normalize_path(path);

        if key.is_empty() {
            return Some(Resolution {
                page_path: self.options.routes_root.join(PAGE_FILE),
                hook_path: self.options.routes_root.join(&self.options.hook_file),
                params: Params::new(),
                route_key: String::new(),
            });
        }

        let table = self.table.load();
        table.match_path(&key).map(|m| Resolution {
            page_path: m.route.page_path.clone(),
            hook_path: m.route.hook_path.clone(),
            params: m.params,
            route_key: key.into_owned(),
        })
    }
}
