use std::{fmt, sync::Arc};

use gallerist_core::{
    CatalogCache, CatalogService, DimensionProbe, MediaProbe, PortAllocator,
    TaskPool,
};

use crate::infra::config::Config;

/// Process-wide services built once at startup.
#[derive(Clone)]
pub struct AppContext {
    config: Arc<Config>,
    ports: Arc<PortAllocator>,
    cache: Arc<CatalogCache>,
    pool: TaskPool,
    catalog: Arc<CatalogService>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("pool_width", &self.pool.width())
            .field("cached_crawlers", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        let probe: Arc<dyn DimensionProbe> = Arc::new(MediaProbe::new(config.ffprobe()));
        Self::with_probe(config, probe)
    }

    /// Build the context around a specific probe implementation.
    pub fn with_probe(config: Config, probe: Arc<dyn DimensionProbe>) -> Self {
        let pool = TaskPool::new(config.probe_concurrency);
        let cache = Arc::new(CatalogCache::new(config.cache_capacity));
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&cache),
            pool.clone(),
            probe,
            config.catalog_settings(),
        ));
        Self {
            config: Arc::new(config),
            ports: Arc::new(PortAllocator::new()),
            cache,
            pool,
            catalog,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ports(&self) -> &PortAllocator {
        &self.ports
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }
}
