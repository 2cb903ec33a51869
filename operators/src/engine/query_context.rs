use std::sync::Arc;

use crate::cache::CacheManager;

/// Per-evaluation access to shared infrastructure, currently the cache
/// manager that intercepts every node production
#[derive(Clone)]
pub struct QueryContext {
    cache: Arc<CacheManager>,
}

impl QueryContext {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }
}
