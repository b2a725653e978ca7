// File: src/render.rs
// Purpose: Page rendering pipeline (cache lookup, composition, hook, cache write)

use std::borrow::Cow;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strata_cache::{Encoding, PageCache};
use strata_router::Resolution;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::helpers::TemplateHelpers;
use crate::hook::{execute_with_timeout, HookData, HookError, HookExecutor};
use crate::reload::inject_reload_script;
use crate::runtime::RuntimeContext;
use crate::template::{page_context, Composition, CompositionError, LAYOUT_TEMPLATE};

#[derive(Debug, Error)]
pub enum RenderError {
    /// Missing page, unmatched route or a hook reporting not-found
    #[error("not found")]
    NotFound,

    /// Hook failure or template failure; the message goes to the client as-is
    #[error("{0}")]
    Server(String),
}

impl From<CompositionError> for RenderError {
    fn from(err: CompositionError) -> Self {
        RenderError::Server(err.to_string())
    }
}

impl From<HookError> for RenderError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::NotFound => RenderError::NotFound,
            other => RenderError::Server(other.to_string()),
        }
    }
}

/// Whether a response came from the page cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A successfully rendered (or cached) page
#[derive(Debug, Clone)]
pub struct Rendered {
    pub body: Vec<u8>,
    pub encoding: Encoding,
    pub cache: CacheStatus,
}

/// Renders dispatched routes
pub struct Renderer {
    config: Arc<Config>,
    runtime: RuntimeContext,
    helpers: Arc<TemplateHelpers>,
    hooks: Arc<dyn HookExecutor>,
    cache: Option<PageCache>,
    cache_write_failures: AtomicU64,
}

impl Renderer {
    pub fn new(
        config: Arc<Config>,
        runtime: RuntimeContext,
        helpers: Arc<TemplateHelpers>,
        hooks: Arc<dyn HookExecutor>,
    ) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| PageCache::new(config.output_root()));

        Self {
            config,
            runtime,
            helpers,
            hooks,
            cache,
            cache_write_failures: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> Option<&PageCache> {
        self.cache.as_ref()
    }

    /// Number of cache writes that failed since startup
    pub fn cache_write_failures(&self) -> u64 {
        self.cache_write_failures.load(Ordering::Relaxed)
    }

    /// Renders a resolved route
    ///
    /// `accepts_gzip` only matters in production with caching enabled: a
    /// precompressed entry is then served as-is.
    pub async fn render(&self, resolution: &Resolution, accepts_gzip: bool) -> Result<Rendered, RenderError> {
        if !file_exists(&resolution.page_path).await {
            return Err(RenderError::NotFound);
        }

        if let Some(hit) = self.lookup_cached(&resolution.route_key, accepts_gzip).await {
            return Ok(self.finish(hit));
        }

        let tera = {
            let page = resolution.page_path.clone();
            let site_root = self.config.paths.root.clone();
            let components_root = self.config.components_root();
            let helpers = self.helpers.clone();

            blocking(move || {
                let composition = Composition::load(&page, &site_root, &components_root)?;
                let tera = composition.compile(&helpers)?;
                Ok(tera)
            })
            .await?
        };

        let data = self.run_hook(resolution).await?;
        let context = page_context(&resolution.params, &data);

        let html = blocking(move || {
            tera.render(LAYOUT_TEMPLATE, &context)
                .map_err(|e| RenderError::from(CompositionError::Execute(e)))
        })
        .await?;

        // The cache holds the page as rendered, shared by both environments
        let body = html.into_bytes();
        self.store_cached(&resolution.route_key, &body).await;

        Ok(self.finish(Rendered {
            body,
            encoding: Encoding::Identity,
            cache: CacheStatus::Miss,
        }))
    }

    /// Adds the reload script to dev responses, fresh or cached
    fn finish(&self, mut rendered: Rendered) -> Rendered {
        if !self.runtime.is_dev() || rendered.encoding != Encoding::Identity {
            return rendered;
        }

        let injected = match inject_reload_script(&String::from_utf8_lossy(&rendered.body)) {
            Cow::Owned(html) => Some(html),
            Cow::Borrowed(_) => None,
        };
        if let Some(html) = injected {
            rendered.body = html.into_bytes();
        }
        rendered
    }

    async fn lookup_cached(&self, route_key: &str, accepts_gzip: bool) -> Option<Rendered> {
        let cache = self.cache.as_ref()?;
        let prefer_gzip = accepts_gzip && !self.runtime.is_dev();

        match cache.lookup(route_key, prefer_gzip).await {
            Ok(Some(page)) => {
                debug!(route_key, encoding = ?page.encoding, "cache hit");
                Some(Rendered {
                    body: page.body,
                    encoding: page.encoding,
                    cache: CacheStatus::Hit,
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!(route_key, error = %e, "cache lookup failed");
                None
            }
        }
    }

    async fn run_hook(&self, resolution: &Resolution) -> Result<HookData, RenderError> {
        if !file_exists(&resolution.hook_path).await {
            return Ok(HookData::new());
        }

        let data = execute_with_timeout(
            self.hooks.as_ref(),
            &resolution.hook_path,
            &resolution.params,
            self.runtime.is_dev(),
            self.config.hooks.timeout(),
        )
        .await?;

        Ok(data)
    }

    /// Best effort: failures are logged and counted, never returned
    async fn store_cached(&self, route_key: &str, body: &[u8]) {
        let Some(cache) = &self.cache else {
            return;
        };

        if let Err(e) = cache.store(route_key, body).await {
            self.record_cache_failure(route_key, &e);
            return;
        }

        if self.config.cache.precompress && !self.runtime.is_dev() {
            if let Err(e) = cache.store_compressed(route_key, body).await {
                self.record_cache_failure(route_key, &e);
            }
        }
    }

    fn record_cache_failure(&self, route_key: &str, err: &anyhow::Error) {
        self.cache_write_failures.fetch_add(1, Ordering::Relaxed);
        warn!(route_key, error = %format!("{:#}", err), "cache write failed");
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Runs template I/O and parsing off the async workers
async fn blocking<T, F>(f: F) -> Result<T, RenderError>
where
    F: FnOnce() -> Result<T, RenderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RenderError::Server(format!("render task failed: {}", e)))?
}
