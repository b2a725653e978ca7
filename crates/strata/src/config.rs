// File: src/config.rs
// Purpose: Configuration parsing from strata.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub hooks: HooksConfig,

    #[serde(default)]
    pub dev: DevConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Site directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Site root; every other path and layout declarations resolve against it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory containing route directories (default: "routes")
    #[serde(default = "default_routes_dir")]
    pub routes_dir: PathBuf,

    /// Directory containing component templates (default: "components")
    #[serde(default = "default_components_dir")]
    pub components_dir: PathBuf,

    /// Directory containing public assets (default: "public")
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Directory receiving cached pages (default: "out")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Also write a gzip sibling on every cache write (prod only)
    #[serde(default)]
    pub precompress: bool,

    /// Emit the `x-strata-cache` HIT/MISS header
    #[serde(default)]
    pub debug_headers: bool,
}

/// Hook executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Hook file extension: `index.server.<extension>`
    #[serde(default = "default_hook_extension")]
    pub extension: String,

    #[serde(default = "default_hook_timeout_ms")]
    pub timeout_ms: u64,
}

/// Development configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    #[serde(default = "default_true")]
    pub watch: bool,
}

// Default values
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_routes_dir() -> PathBuf {
    PathBuf::from("routes")
}

fn default_components_dir() -> PathBuf {
    PathBuf::from("components")
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_hook_extension() -> String {
    "json".to_string()
}

fn default_hook_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            routes_dir: default_routes_dir(),
            components_dir: default_components_dir(),
            public_dir: default_public_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            extension: default_hook_extension(),
            timeout_ms: default_hook_timeout_ms(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self { watch: true }
    }
}

impl HooksConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist or is empty, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load configuration from default path (./strata.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("strata.toml")
    }

    /// Config rooted at a site directory, everything else default
    pub fn for_site(root: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.paths.root = root.into();
        config
    }

    pub fn routes_root(&self) -> PathBuf {
        self.paths.root.join(&self.paths.routes_dir)
    }

    pub fn components_root(&self) -> PathBuf {
        self.paths.root.join(&self.paths.components_dir)
    }

    pub fn public_root(&self) -> PathBuf {
        self.paths.root.join(&self.paths.public_dir)
    }

    pub fn output_root(&self) -> PathBuf {
        self.paths.root.join(&self.paths.output_dir)
    }

    /// Reserved error page directory (`<routes>/_error`)
    pub fn error_root(&self) -> PathBuf {
        self.routes_root().join(strata_router::ERROR_DIR)
    }

    pub fn hook_file(&self) -> String {
        strata_router::hook_file_name(&self.hooks.extension)
    }
}
