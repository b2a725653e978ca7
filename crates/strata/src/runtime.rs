//! Process-wide runtime context, fixed at startup

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Called after every watched filesystem change (development only)
pub type ReloadCallback = Arc<dyn Fn() + Send + Sync>;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn is_dev(&self) -> bool {
        matches!(self, Environment::Dev)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(format!("unknown environment: {:?} (expected dev or prod)", other)),
        }
    }
}

/// Environment mode, watch flag and reload callback
///
/// Read-only once constructed; every component gets a clone.
#[derive(Clone, Default)]
pub struct RuntimeContext {
    pub env: Environment,
    pub watch: bool,
    pub on_reload: Option<ReloadCallback>,
}

impl RuntimeContext {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            watch: false,
            on_reload: None,
        }
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_reload(mut self, callback: ReloadCallback) -> Self {
        self.on_reload = Some(callback);
        self
    }

    pub fn is_dev(&self) -> bool {
        self.env.is_dev()
    }
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("env", &self.env)
            .field("watch", &self.watch)
            .field("on_reload", &self.on_reload.is_some())
            .finish()
    }
}
