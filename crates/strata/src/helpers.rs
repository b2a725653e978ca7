//! Template helper functions available inside every page, layout and component

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tera::{Tera, Value};

use crate::runtime::Environment;

/// Signature of a helper callable from templates: `{{ name(arg=value) }}`
pub type HelperFn = Arc<dyn Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync>;

/// Set of named helpers, built once per process and shared by reference
///
/// Built-ins:
/// - `env()` → `"dev"` or `"prod"`
/// - `is_dev()` → boolean
#[derive(Clone)]
pub struct TemplateHelpers {
    env: Environment,
    output_dir: PathBuf,
    functions: Vec<(String, HelperFn)>,
}

impl TemplateHelpers {
    pub fn new(env: Environment, output_dir: impl Into<PathBuf>) -> Self {
        let builtins: Vec<(String, HelperFn)> = vec![
            (
                "env".to_string(),
                Arc::new(move |_: &HashMap<String, Value>| Ok(Value::from(env.as_str()))),
            ),
            (
                "is_dev".to_string(),
                Arc::new(move |_: &HashMap<String, Value>| Ok(Value::from(env.is_dev()))),
            ),
        ];

        Self {
            env,
            output_dir: output_dir.into(),
            functions: builtins,
        }
    }

    /// Adds (or replaces) a helper
    pub fn with_function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.functions.retain(|(existing, _)| *existing != name);
        self.functions.push((name, Arc::new(f)));
        self
    }

    pub fn env(&self) -> Environment {
        self.env
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|(name, _)| name.as_str())
    }

    /// Registers every helper on a template namespace
    pub fn install(&self, tera: &mut Tera) {
        for (name, f) in &self.functions {
            let f = f.clone();
            tera.register_function(name, move |args: &HashMap<String, Value>| f(args));
        }
    }
}

impl fmt::Debug for TemplateHelpers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateHelpers")
            .field("env", &self.env)
            .field("output_dir", &self.output_dir)
            .field("functions", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
