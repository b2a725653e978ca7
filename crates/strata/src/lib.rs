// Strata - convention-driven server-side rendering
// Directory routes, layered Tera templates, disk page cache, live reload

pub mod config;
pub mod runtime;

// Rendering pipeline
pub mod helpers;
pub mod hook;
pub mod template;
pub mod render;
pub mod error_page;

// Serving
pub mod engine;
pub mod http;
pub mod reload;
pub mod watcher;

// Re-export framework types
pub use config::Config;
pub use engine::{Engine, EngineBuilder, Outcome};
pub use error_page::{ErrorPage, ErrorPresenter};
pub use helpers::TemplateHelpers;
pub use hook::{HookData, HookError, HookExecutor, JsonHook};
pub use reload::ReloadHub;
pub use render::{CacheStatus, RenderError, Rendered, Renderer};
pub use runtime::{Environment, ReloadCallback, RuntimeContext};
pub use watcher::{spawn_watcher, WatchHandle};

// Re-export the routing and cache layers
pub use strata_cache::{self as cache, Encoding, PageCache};
pub use strata_router::{self as router, Dispatcher, Params, Resolution, RouteTable};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;
pub use axum::http::StatusCode;
