//! The spatiotemporal semantic cache.
//!
//! Results are keyed by the producing subtree's semantic id plus the query
//! rectangle; a lookup hits when a stored result spatially, temporally and by
//! resolution subsumes the incoming query, see [`stcache`].

mod policy;
mod stcache;

pub use policy::{EntryId, EvictionPolicy, FifoPolicy, LruPolicy, PolicyKind};
pub use stcache::StCache;

use std::future::Future;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use geoproc_datatypes::collections::{LineCollection, PointCollection, PolygonCollection};
use geoproc_datatypes::plots::Plot;
use geoproc_datatypes::primitives::{QueryRectangle, TemporalBound};
use geoproc_datatypes::raster::GenericRaster;
use geoproc_datatypes::results::QueryResult;

use crate::util::Result;

/// Sizing and behavior of the cache, one section in the server's settings
/// file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CacheConfig {
    pub enabled: bool,
    pub policy: PolicyKind,
    pub temporal_bound: TemporalBound,
    /// byte budget of the raster cache
    pub raster_size: usize,
    /// byte budget of each vector cache (points, lines, polygons)
    pub vector_size: usize,
    /// byte budget of the plot cache
    pub plot_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: PolicyKind::default(),
            temporal_bound: TemporalBound::default(),
            raster_size: 5 * 1024 * 1024,
            vector_size: 1024 * 1024,
            plot_size: 256 * 1024,
        }
    }
}

struct InFlight {
    fingerprint: String,
    query: QueryRectangle,
    done: watch::Receiver<bool>,
}

/// One result kind's cache: the synchronous core behind a lock, plus an
/// in-flight table that guarantees at most one producer run per
/// `(fingerprint, query)`.
pub struct Cache<T>
where
    T: QueryResult,
{
    state: Mutex<StCache<T>>,
    in_flight: Mutex<Vec<InFlight>>,
}

impl<T> Cache<T>
where
    T: QueryResult,
{
    pub fn new(max_size: usize, policy: PolicyKind, temporal_bound: TemporalBound) -> Self {
        Self {
            state: Mutex::new(StCache::new(max_size, policy.create(), temporal_bound)),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub async fn get(&self, fingerprint: &str, query: &QueryRectangle) -> Result<Option<T>> {
        self.state.lock().await.get(fingerprint, query)
    }

    pub async fn put(&self, fingerprint: &str, payload: &T) -> Result<()> {
        self.state.lock().await.put(fingerprint, payload)
    }

    /// Returns a cached result subsuming the query or runs `producer` and
    /// stores its output.
    ///
    /// Two simultaneous misses on the same `(fingerprint, query)` run the
    /// producer once: the second caller waits for the first and retries its
    /// lookup. Misses on distinct keys proceed concurrently. Producer
    /// failures propagate unchanged and are not memoized; a waiter that woke
    /// to a failed build becomes the next builder itself.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &str,
        query: &QueryRectangle,
        producer: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let done_tx = loop {
            if let Some(hit) = self.state.lock().await.get(fingerprint, query)? {
                return Ok(hit);
            }

            let mut in_flight = self.in_flight.lock().await;
            let pending = in_flight
                .iter()
                .find(|p| p.fingerprint == fingerprint && p.query == *query)
                .map(|p| p.done.clone());

            match pending {
                Some(mut done) => {
                    drop(in_flight);
                    if done.changed().await.is_err() {
                        // the builder vanished without signalling (dropped
                        // mid-build); prune its marker before retrying
                        self.prune_stale(fingerprint, query).await;
                    }
                }
                None => {
                    let (tx, rx) = watch::channel(false);
                    in_flight.push(InFlight {
                        fingerprint: fingerprint.to_string(),
                        query: *query,
                        done: rx,
                    });
                    break tx;
                }
            }
        };

        debug!(
            "Calling producer for {} in bucket \"{}\"",
            query, fingerprint
        );
        let result = producer().await;

        let put_result = match &result {
            Ok(payload) => self.state.lock().await.put(fingerprint, payload),
            Err(_) => Ok(()),
        };

        self.in_flight
            .lock()
            .await
            .retain(|p| !(p.fingerprint == fingerprint && p.query == *query));
        let _ = done_tx.send(true);

        let payload = result?;
        put_result?;
        Ok(payload)
    }

    async fn prune_stale(&self, fingerprint: &str, query: &QueryRectangle) {
        self.in_flight.lock().await.retain(|p| {
            !(p.fingerprint == fingerprint
                && p.query == *query
                && p.done.has_changed().is_err())
        });
    }
}

/// One [`Cache`] per result kind
pub struct DefaultCacheManager {
    raster: Cache<GenericRaster>,
    points: Cache<PointCollection>,
    lines: Cache<LineCollection>,
    polygons: Cache<PolygonCollection>,
    plots: Cache<Plot>,
}

impl DefaultCacheManager {
    pub fn new(config: &CacheConfig) -> Self {
        fn cache<T: QueryResult>(size: usize, policy: PolicyKind, temporal_bound: TemporalBound) -> Cache<T> {
            Cache::new(size, policy, temporal_bound)
        }
        Self {
            raster: cache(config.raster_size, config.policy, config.temporal_bound),
            points: cache(config.vector_size, config.policy, config.temporal_bound),
            lines: cache(config.vector_size, config.policy, config.temporal_bound),
            polygons: cache(config.vector_size, config.policy, config.temporal_bound),
            plots: cache(config.plot_size, config.policy, config.temporal_bound),
        }
    }
}

/// Ties a result container to its cache inside the manager
pub trait CacheElement: QueryResult {
    fn cache(manager: &DefaultCacheManager) -> &Cache<Self>;
}

impl CacheElement for GenericRaster {
    fn cache(manager: &DefaultCacheManager) -> &Cache<Self> {
        &manager.raster
    }
}

impl CacheElement for PointCollection {
    fn cache(manager: &DefaultCacheManager) -> &Cache<Self> {
        &manager.points
    }
}

impl CacheElement for LineCollection {
    fn cache(manager: &DefaultCacheManager) -> &Cache<Self> {
        &manager.lines
    }
}

impl CacheElement for PolygonCollection {
    fn cache(manager: &DefaultCacheManager) -> &Cache<Self> {
        &manager.polygons
    }
}

impl CacheElement for Plot {
    fn cache(manager: &DefaultCacheManager) -> &Cache<Self> {
        &manager.plots
    }
}

/// What the dispatcher talks to: the real cache, or a no-op stand-in that
/// always calls the producer when caching is disabled
pub enum CacheManager {
    Default(DefaultCacheManager),
    Nop,
}

impl CacheManager {
    pub fn from_config(config: &CacheConfig) -> Self {
        if config.enabled {
            CacheManager::Default(DefaultCacheManager::new(config))
        } else {
            CacheManager::Nop
        }
    }

    pub fn nop() -> Self {
        CacheManager::Nop
    }

    pub async fn get_or_compute<T, F, Fut>(
        &self,
        fingerprint: &str,
        query: &QueryRectangle,
        producer: F,
    ) -> Result<T>
    where
        T: CacheElement,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self {
            CacheManager::Default(manager) => {
                T::cache(manager)
                    .get_or_compute(fingerprint, query, producer)
                    .await
            }
            CacheManager::Nop => producer().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use geoproc_datatypes::primitives::{CrsId, SpatioTemporalReference, TimeInterval};

    fn query() -> QueryRectangle {
        QueryRectangle::new(CrsId::WGS84, 0.0, 0.0, 1.0, 1.0, 50.0, 1, 1).unwrap()
    }

    fn plot() -> Plot {
        let q = query();
        Plot::new(
            SpatioTemporalReference::from_query(&q, TimeInterval::new(0.0, 100.0).unwrap()),
            "{}".to_string(),
        )
    }

    #[tokio::test]
    async fn concurrent_misses_run_the_producer_once() {
        let cache = Arc::new(Cache::<Plot>::new(
            1024 * 1024,
            PolicyKind::Lru,
            TemporalBound::Closed,
        ));
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let invocations = Arc::clone(&invocations);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_compute("fp", &query(), || async {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(plot())
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn distinct_fingerprints_do_not_serialize() {
        let cache = Arc::new(Cache::<Plot>::new(
            1024 * 1024,
            PolicyKind::Lru,
            TemporalBound::Closed,
        ));
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for fingerprint in ["a", "b"] {
            let cache = Arc::clone(&cache);
            let invocations = Arc::clone(&invocations);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_compute(fingerprint, &query(), || async {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        Ok(plot())
                    })
                    .await
                    .unwrap()
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn producer_failures_are_not_memoized() {
        let cache = Cache::<Plot>::new(1024 * 1024, PolicyKind::Lru, TemporalBound::Closed);

        let failed: Result<Plot> = cache
            .get_or_compute("fp", &query(), || async {
                Err(crate::error::Error::DoesNotProduce {
                    kind: geoproc_datatypes::results::ResultKind::Plot,
                })
            })
            .await;
        assert!(failed.is_err());

        // the next caller computes again and succeeds
        let produced = cache
            .get_or_compute("fp", &query(), || async { Ok(plot()) })
            .await
            .unwrap();
        assert_eq!(produced, plot());
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_the_cache() {
        let cache = Cache::<Plot>::new(1024 * 1024, PolicyKind::Lru, TemporalBound::Closed);
        let invocations = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_compute("fp", &query(), || async {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    Ok(plot())
                })
                .await
                .unwrap();
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nop_manager_always_calls_the_producer() {
        let manager = CacheManager::nop();
        let invocations = AtomicUsize::new(0);

        for _ in 0..2 {
            let _: Plot = manager
                .get_or_compute("fp", &query(), || async {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    Ok(plot())
                })
                .await
                .unwrap();
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_config_yields_the_nop_manager() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        assert!(matches!(
            CacheManager::from_config(&config),
            CacheManager::Nop
        ));
    }
}
