//! Backend plus kernel cache, shared by every kernel and engine.

use std::sync::Arc;

use bon::bon;
use kiln_device::{Backend, KernelCache, NullCache};

use crate::config::RuntimeConfig;

#[derive(Debug, Clone)]
pub struct Context {
    backend: Arc<dyn Backend>,
    cache: Arc<dyn KernelCache>,
}

#[bon]
impl Context {
    /// Without a cache every kernel is compiled from source.
    #[builder]
    pub fn new(backend: Arc<dyn Backend>, cache: Option<Arc<dyn KernelCache>>) -> Self {
        Self { backend, cache: cache.unwrap_or_else(|| Arc::new(NullCache)) }
    }

    /// Context whose cache follows [`RuntimeConfig::from_env`].
    pub fn from_env(backend: Arc<dyn Backend>) -> Self {
        Self::with_config(backend, &RuntimeConfig::from_env())
    }

    pub fn with_config(backend: Arc<dyn Backend>, config: &RuntimeConfig) -> Self {
        Self { backend, cache: config.open_cache() }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn cache(&self) -> &Arc<dyn KernelCache> {
        &self.cache
    }
}
