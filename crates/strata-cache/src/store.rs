//! Filesystem page store

use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

use crate::compress;

const ENTRY_FILE: &str = "index.html";
const GZIP_SUFFIX: &str = ".gz";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Content encoding of a cached body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    Gzip,
}

impl Encoding {
    /// Value for the `content-encoding` header, if any
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            Encoding::Identity => None,
            Encoding::Gzip => Some("gzip"),
        }
    }
}

/// A page read back from the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub body: Vec<u8>,
    pub encoding: Encoding,
}

/// Filesystem cache of rendered pages
///
/// Persistent across restarts; one directory per route key under the
/// output directory.
#[derive(Debug, Clone)]
pub struct PageCache {
    root: PathBuf,
}

impl PageCache {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: output_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the plain entry for a route key
    ///
    /// Returns `None` for keys that could escape the output directory
    /// (`.`/`..` segments, backslashes, NUL, absolute components).
    pub fn entry_path(&self, route_key: &str) -> Option<PathBuf> {
        if !is_safe_key(route_key) {
            return None;
        }

        Some(self.root.join(route_key).join(ENTRY_FILE))
    }

    /// Path of the precompressed sibling for a route key
    pub fn compressed_path(&self, route_key: &str) -> Option<PathBuf> {
        self.entry_path(route_key).map(|p| with_suffix(&p, GZIP_SUFFIX))
    }

    /// Looks up a cached page
    ///
    /// With `prefer_gzip`, the precompressed sibling is returned when it
    /// exists; otherwise (or when it is absent) the plain entry. Absence is
    /// a miss (`Ok(None)`), not an error.
    pub async fn lookup(&self, route_key: &str, prefer_gzip: bool) -> Result<Option<CachedPage>> {
        let Some(plain) = self.entry_path(route_key) else {
            tracing::debug!(route_key, "unsafe route key, treating as cache miss");
            return Ok(None);
        };

        if prefer_gzip {
            let gz = with_suffix(&plain, GZIP_SUFFIX);
            if let Some(body) = read_if_exists(&gz).await? {
                return Ok(Some(CachedPage {
                    body,
                    encoding: Encoding::Gzip,
                }));
            }
        }

        Ok(read_if_exists(&plain).await?.map(|body| CachedPage {
            body,
            encoding: Encoding::Identity,
        }))
    }

    /// Stores the plain entry, creating parent directories as needed
    pub async fn store(&self, route_key: &str, html: &[u8]) -> Result<PathBuf> {
        let Some(path) = self.entry_path(route_key) else {
            bail!("Refusing to cache unsafe route key: {:?}", route_key);
        };

        write_atomic(&path, html).await?;
        Ok(path)
    }

    /// Gzips and stores the precompressed sibling
    pub async fn store_compressed(&self, route_key: &str, html: &[u8]) -> Result<PathBuf> {
        let Some(path) = self.compressed_path(route_key) else {
            bail!("Refusing to cache unsafe route key: {:?}", route_key);
        };

        let packed = compress::gzip(html, compress::DEFAULT_LEVEL).context("Failed to gzip page")?;
        write_atomic(&path, &packed).await?;
        Ok(path)
    }
}

fn is_safe_key(route_key: &str) -> bool {
    if route_key.contains('\\') || route_key.contains('\0') {
        return false;
    }

    Path::new(route_key)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        && !route_key.split('/').any(|seg| seg == "." || seg == "..")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }

    match fs::read(path).await {
        Ok(body) => Ok(Some(body)),
        // Removed between the existence check and the read
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read cache file: {:?}", path)),
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Cache path has no parent: {:?}", path))?;

    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;

    let tmp = with_suffix(
        path,
        &format!(
            ".tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ),
    );

    fs::write(&tmp, data)
        .await
        .with_context(|| format!("Failed to write cache file: {:?}", tmp))?;

    if let Err(e) = fs::rename(&tmp, path).await {
        fs::remove_file(&tmp).await.ok();
        return Err(e).with_context(|| format!("Failed to publish cache file: {:?}", path));
    }

    Ok(())
}
