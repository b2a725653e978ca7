//! Per-route server hooks
//!
//! A hook turns `(hook file, params, dev flag)` into the data mapping a page
//! is rendered against. Running arbitrary hook logic is the executor's job;
//! the renderer only decides when to call it and bounds how long it may take.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::Params;

/// Data mapping produced by a hook
pub type HookData = Map<String, Value>;

#[derive(Debug, Error)]
pub enum HookError {
    /// The hook decided the requested resource does not exist
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Failed(String),

    #[error("hook timed out after {0:?}")]
    TimedOut(Duration),
}

/// Executes a route's hook file
#[async_trait]
pub trait HookExecutor: Send + Sync {
    async fn execute(&self, hook: &Path, params: &Params, dev: bool) -> Result<HookData, HookError>;
}

/// Static data hooks
///
/// The hook file is a JSON object used verbatim as the data mapping. A
/// top-level `"notFound": true` signals not-found instead.
///
/// ```json
/// { "Title": "Hello", "posts": [1, 2, 3] }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHook;

pub const NOT_FOUND_KEY: &str = "notFound";

#[async_trait]
impl HookExecutor for JsonHook {
    async fn execute(&self, hook: &Path, _params: &Params, _dev: bool) -> Result<HookData, HookError> {
        let raw = tokio::fs::read_to_string(hook)
            .await
            .map_err(|e| HookError::Failed(format!("failed to read {}: {}", hook.display(), e)))?;

        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| HookError::Failed(format!("invalid JSON in {}: {}", hook.display(), e)))?;

        let Value::Object(data) = value else {
            return Err(HookError::Failed(format!(
                "{} must contain a JSON object",
                hook.display()
            )));
        };

        if data.get(NOT_FOUND_KEY).and_then(Value::as_bool) == Some(true) {
            return Err(HookError::NotFound);
        }

        Ok(data)
    }
}

/// Runs a hook with an upper bound on its duration
///
/// The hook future is dropped (cancelled) once `limit` elapses.
pub async fn execute_with_timeout(
    executor: &dyn HookExecutor,
    hook: &Path,
    params: &Params,
    dev: bool,
    limit: Duration,
) -> Result<HookData, HookError> {
    match tokio::time::timeout(limit, executor.execute(hook, params, dev)).await {
        Ok(result) => result,
        Err(_) => Err(HookError::TimedOut(limit)),
    }
}
