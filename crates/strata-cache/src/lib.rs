//! # Strata Cache
//!
//! Rendered pages persisted on disk, addressed by route key:
//!
//! ```text
//! <output_dir>/<route_key>/index.html
//! <output_dir>/<route_key>/index.html.gz   (optional precompressed sibling)
//! ```
//!
//! There is no expiry and no invalidation. Writes overwrite unconditionally
//! and land through a temp file + rename, so concurrent readers see either
//! the old or the new page, never a torn one.
//!
//! ## Example
//!
//! ```rust
//! use strata_cache::PageCache;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let dir = std::env::temp_dir().join("strata-cache-doc");
//!     let cache = PageCache::new(&dir);
//!
//!     cache.store("blog/hello", b"<p>hi</p>").await?;
//!     let page = cache.lookup("blog/hello", false).await?.unwrap();
//!     assert_eq!(page.body, b"<p>hi</p>");
//!     Ok(())
//! }
//! ```

pub mod compress;
mod store;

pub use store::{CachedPage, Encoding, PageCache};
