// File: src/error_page.rs
// Purpose: Styled error pages with a plain-text last resort

use axum::http::StatusCode;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Context;
use tracing::{debug, warn};

use crate::config::Config;
use crate::helpers::TemplateHelpers;
use crate::reload::inject_reload_script;
use crate::runtime::RuntimeContext;
use crate::template::{Composition, CompositionError};

/// Generic error page inside the error directory
pub const DEFAULT_ERROR_FILE: &str = "index.html";

/// An error response body, always paired with its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub body: String,
    /// `false` when the literal `"<status> - <message>"` fallback was used
    pub is_html: bool,
}

/// Renders `<routes>/_error/<status>.html`, then `<routes>/_error/index.html`
pub struct ErrorPresenter {
    config: Arc<Config>,
    runtime: RuntimeContext,
    helpers: Arc<TemplateHelpers>,
}

impl ErrorPresenter {
    pub fn new(config: Arc<Config>, runtime: RuntimeContext, helpers: Arc<TemplateHelpers>) -> Self {
        Self {
            config,
            runtime,
            helpers,
        }
    }

    /// Candidate files in the order they are tried
    pub fn candidates(&self, status: StatusCode) -> [PathBuf; 2] {
        let root = self.config.error_root();
        [
            root.join(format!("{}.html", status.as_u16())),
            root.join(DEFAULT_ERROR_FILE),
        ]
    }

    /// Never fails: falls back to `"<status> - <message>"`
    pub async fn present(&self, status: StatusCode, message: &str, path: &str) -> ErrorPage {
        let candidates = self.candidates(status);
        let context = error_context(status, message, path);
        let site_root = self.config.paths.root.clone();
        let components_root = self.config.components_root();
        let helpers = self.helpers.clone();

        let rendered = tokio::task::spawn_blocking(move || {
            candidates.iter().find_map(|file| {
                match render_candidate(file, &site_root, &components_root, &helpers, &context) {
                    Ok(html) => Some(html),
                    Err(e) => {
                        debug!(file = %file.display(), error = %e, "error page candidate skipped");
                        None
                    }
                }
            })
        })
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "error page task failed");
            None
        });

        match rendered {
            Some(html) => {
                let body = if self.runtime.is_dev() {
                    inject_reload_script(&html).into_owned()
                } else {
                    html
                };

                ErrorPage {
                    status,
                    body,
                    is_html: true,
                }
            }
            None => ErrorPage {
                status,
                body: format!("{} - {}", status.as_u16(), message),
                is_html: false,
            },
        }
    }
}

fn render_candidate(
    file: &Path,
    site_root: &Path,
    components_root: &Path,
    helpers: &TemplateHelpers,
    context: &Context,
) -> Result<String, CompositionError> {
    let mut composition = Composition::load(file, site_root, components_root)?;

    // A declared layout replaces the default one instead of sitting beside it
    if composition.has_declared_layout() {
        composition = composition.without_default_layout();
    }

    composition.render(helpers, context)
}

fn error_context(status: StatusCode, message: &str, path: &str) -> Context {
    let value = json!({
        "Title": format!("{} - {}", status.as_u16(), message),
        "StatusCode": status.as_u16(),
        "Message": message,
        "Path": path,
        "Description": message,
    });

    // Infallible for an object literal
    Context::from_value(value).unwrap_or_default()
}
