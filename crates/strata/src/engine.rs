// File: src/engine.rs
// Purpose: Wires dispatcher, renderer, error pages and watcher together

use axum::http::StatusCode;
use std::sync::Arc;
use strata_router::{Dispatcher, ScanOptions};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error_page::{ErrorPage, ErrorPresenter};
use crate::helpers::TemplateHelpers;
use crate::hook::{HookExecutor, JsonHook};
use crate::reload::ReloadHub;
use crate::render::{RenderError, Rendered, Renderer};
use crate::runtime::RuntimeContext;
use crate::watcher::{spawn_watcher, WatchHandle};

pub const NOT_FOUND_MESSAGE: &str = "Page not found";

/// What a request produced
#[derive(Debug)]
pub enum Outcome {
    Page(Rendered),
    /// Not-found chain result: styled page or literal text, status set
    Error(ErrorPage),
    /// Hook or template failure, sent as plain text with status 500
    ServerError(String),
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Page(_) => StatusCode::OK,
            Outcome::Error(page) => page.status,
            Outcome::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A configured site, ready to serve requests
pub struct Engine {
    config: Arc<Config>,
    runtime: RuntimeContext,
    dispatcher: Arc<Dispatcher>,
    renderer: Renderer,
    errors: ErrorPresenter,
    reload: Option<ReloadHub>,
    watch: Option<WatchHandle>,
}

impl Engine {
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Resolves and renders one request path (already percent-decoded)
    pub async fn handle(&self, path: &str, accepts_gzip: bool) -> Outcome {
        let Some(resolution) = self.dispatcher.resolve(path) else {
            return self.not_found(path).await;
        };

        match self.renderer.render(&resolution, accepts_gzip).await {
            Ok(rendered) => Outcome::Page(rendered),
            Err(RenderError::NotFound) => self.not_found(path).await,
            Err(RenderError::Server(message)) => {
                error!(path, error = %message, "render failed");
                Outcome::ServerError(message)
            }
        }
    }

    async fn not_found(&self, path: &str) -> Outcome {
        Outcome::Error(
            self.errors
                .present(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE, path)
                .await,
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runtime(&self) -> &RuntimeContext {
        &self.runtime
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn errors(&self) -> &ErrorPresenter {
        &self.errors
    }

    /// Live-reload hub; `None` outside dev or when watching is unavailable
    pub fn reload_hub(&self) -> Option<&ReloadHub> {
        self.reload.as_ref()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Stops the background watcher, if any
    pub async fn stop_watching(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.stop().await;
        }
    }
}

/// Builder for [`Engine`]
///
/// ```no_run
/// # async fn run() {
/// use strata::{Config, Engine, Environment, ReloadHub, RuntimeContext};
///
/// let engine = Engine::builder(Config::for_site("site"))
///     .runtime(RuntimeContext::new(Environment::Dev).with_watch(true))
///     .reload_hub(ReloadHub::new())
///     .build();
/// # }
/// ```
pub struct EngineBuilder {
    config: Config,
    runtime: RuntimeContext,
    hooks: Option<Arc<dyn HookExecutor>>,
    helpers: Option<TemplateHelpers>,
    reload: Option<ReloadHub>,
}

impl EngineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            runtime: RuntimeContext::default(),
            hooks: None,
            helpers: None,
            reload: None,
        }
    }

    pub fn runtime(mut self, runtime: RuntimeContext) -> Self {
        self.runtime = runtime;
        self
    }

    /// Hook executor; defaults to [`JsonHook`]
    pub fn hooks(mut self, hooks: impl HookExecutor + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Template helpers; defaults to the built-ins for the runtime env
    pub fn helpers(mut self, helpers: TemplateHelpers) -> Self {
        self.helpers = Some(helpers);
        self
    }

    /// Enables the reload socket; ignored outside dev
    pub fn reload_hub(mut self, hub: ReloadHub) -> Self {
        self.reload = Some(hub);
        self
    }

    /// Scans routes and, when watching is on, starts the watcher
    ///
    /// Must be called from within a Tokio runtime when watching. A watcher
    /// that fails to start is logged and live reload is disabled; the
    /// engine still serves.
    pub fn build(self) -> Engine {
        let config = Arc::new(self.config);
        let mut runtime = self.runtime;

        let mut reload = self.reload.filter(|_| runtime.is_dev());
        if let Some(hub) = &reload {
            if runtime.on_reload.is_none() {
                runtime.on_reload = Some(hub.callback());
            }
        }

        let helpers = Arc::new(
            self.helpers
                .unwrap_or_else(|| TemplateHelpers::new(runtime.env, config.output_root())),
        );
        let hooks = self.hooks.unwrap_or_else(|| Arc::new(JsonHook));

        let dispatcher = Arc::new(Dispatcher::new(ScanOptions::new(
            config.routes_root(),
            config.hook_file(),
        )));
        info!(
            routes = dispatcher.snapshot().len(),
            env = %runtime.env,
            "routes loaded"
        );

        let watch = if runtime.watch {
            let roots = vec![
                config.routes_root(),
                config.components_root(),
                config.public_root(),
            ];

            match spawn_watcher(dispatcher.clone(), roots, runtime.clone()) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "file watcher unavailable, live reload disabled");
                    reload = None;
                    runtime.on_reload = None;
                    None
                }
            }
        } else {
            None
        };

        let renderer = Renderer::new(config.clone(), runtime.clone(), helpers.clone(), hooks);
        let errors = ErrorPresenter::new(config.clone(), runtime.clone(), helpers);

        Engine {
            config,
            runtime,
            dispatcher,
            renderer,
            errors,
            reload,
            watch,
        }
    }
}
