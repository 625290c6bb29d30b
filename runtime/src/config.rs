//! Runtime configuration.
//!
//! Supports explicit configuration through a bon builder and environment variable fallbacks.

use std::path::PathBuf;
use std::sync::Arc;

use bon::bon;
use kiln_device::{KernelCache, NullCache, PersistentCache};

/// Directory name appended to the fallback base directories.
pub const CACHE_DIR_NAME: &str = "kiln-cache";

/// Where compiled kernel binaries are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheLocation {
    /// No caching; every kernel is compiled from source.
    #[default]
    Disabled,
    /// Process-local cache.
    Memory,
    Directory(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub cache: CacheLocation,
}

#[bon]
impl RuntimeConfig {
    #[builder]
    pub fn new(#[builder(default)] cache: CacheLocation) -> Self {
        Self { cache }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `KILN_DISABLE_CACHE` - Disable the kernel cache if set
    /// * `KILN_CACHE_DIR` - Cache directory; `:memory:` keeps the cache in process memory
    /// * `LOCALAPPDATA`, `HOME`, `USERPROFILE` - Tried in order when `KILN_CACHE_DIR` is unset;
    ///   the cache lives in `kiln-cache` under the first one found
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        if lookup("KILN_DISABLE_CACHE").is_some() {
            return Self { cache: CacheLocation::Disabled };
        }

        let cache = match lookup("KILN_CACHE_DIR").filter(|dir| !dir.is_empty()) {
            Some(dir) if dir == ":memory:" => CacheLocation::Memory,
            Some(dir) => CacheLocation::Directory(PathBuf::from(dir)),
            None => ["LOCALAPPDATA", "HOME", "USERPROFILE"]
                .into_iter()
                .find_map(|key| lookup(key).filter(|base| !base.is_empty()))
                .map(|base| CacheLocation::Directory(PathBuf::from(base).join(CACHE_DIR_NAME)))
                .unwrap_or_default(),
        };
        Self { cache }
    }

    /// Instantiate the configured cache.
    ///
    /// A directory that cannot be created degrades to no caching.
    pub fn open_cache(&self) -> Arc<dyn KernelCache> {
        match &self.cache {
            CacheLocation::Disabled => Arc::new(NullCache),
            CacheLocation::Memory => Arc::new(PersistentCache::in_memory()),
            CacheLocation::Directory(dir) => match PersistentCache::open(dir) {
                Ok(cache) => Arc::new(cache),
                Err(err) => {
                    tracing::warn!(cache.dir = %dir.display(), error = %err, "kernel cache unavailable; caching disabled");
                    Arc::new(NullCache)
                }
            },
        }
    }
}
