use std::collections::HashMap;

use log::{debug, info, warn};
use snafu::ensure;

use geoproc_datatypes::primitives::{QueryRectangle, TemporalBound, TimeType};
use geoproc_datatypes::results::QueryResult;

use crate::error::{self, Error};
use crate::util::Result;

use super::policy::{EntryId, EvictionPolicy};

struct CacheEntry<T> {
    payload: T,
    size: usize,
    /// key of the bucket this entry lives in, for O(1) unlinking
    fingerprint: String,
}

/// The synchronous cache core: fingerprint buckets over an entry pool with
/// byte accounting and pluggable eviction.
///
/// Invariants: the sum of all entry sizes equals `current_size`;
/// `current_size <= max_size` between operations; every entry is reachable
/// from exactly one bucket and one policy record.
pub struct StCache<T>
where
    T: QueryResult,
{
    buckets: HashMap<String, Vec<EntryId>>,
    entries: HashMap<EntryId, CacheEntry<T>>,
    policy: Box<dyn EvictionPolicy>,
    next_id: u64,
    current_size: usize,
    max_size: usize,
    temporal_bound: TemporalBound,
}

impl<T> StCache<T>
where
    T: QueryResult,
{
    pub fn new(
        max_size: usize,
        policy: Box<dyn EvictionPolicy>,
        temporal_bound: TemporalBound,
    ) -> Self {
        Self {
            buckets: HashMap::new(),
            entries: HashMap::new(),
            policy,
            next_id: 0,
            current_size: 0,
            max_size,
            temporal_bound,
        }
    }

    /// Scans the fingerprint's bucket in insertion order and returns a deep
    /// copy of the first entry subsuming the query, or `None`.
    pub fn get(&mut self, fingerprint: &str, query: &QueryRectangle) -> Result<Option<T>> {
        debug!("Get: querying {} in bucket \"{}\"", query, fingerprint);

        let mut hit = None;
        if let Some(bucket) = self.buckets.get(fingerprint) {
            for &id in bucket {
                if let Some(entry) = self.entries.get(&id) {
                    if matches(query, &entry.payload, self.temporal_bound)? {
                        hit = Some(id);
                        break;
                    }
                }
            }
        }

        match hit {
            Some(id) => {
                self.policy.on_access(id);
                info!("HIT for query {}", query);
                Ok(self.entries.get(&id).map(|entry| entry.payload.clone()))
            }
            None => {
                info!("MISS for query {}", query);
                Ok(None)
            }
        }
    }

    /// Inserts a deep copy of the payload, evicting until it fits. An
    /// oversize payload is logged and dropped without insertion.
    pub fn put(&mut self, fingerprint: &str, payload: &T) -> Result<()> {
        let size = payload.byte_size();
        debug!(
            "Adding entry of {} bytes for bucket \"{}\"",
            size, fingerprint
        );

        if size > self.max_size {
            warn!(
                "Entry of {} bytes exceeds the cache budget of {} bytes, not inserting",
                size, self.max_size
            );
            return Ok(());
        }

        while self.current_size + size > self.max_size {
            match self.policy.evict() {
                Some(victim) => self.remove_entry(victim),
                None => return Err(Error::CacheOverfull),
            }
        }

        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.current_size += size;
        self.entries.insert(
            id,
            CacheEntry {
                payload: payload.clone(),
                size,
                fingerprint: fingerprint.to_string(),
            },
        );
        self.buckets
            .entry(fingerprint.to_string())
            .or_default()
            .push(id);
        self.policy.on_insert(id);

        Ok(())
    }

    fn remove_entry(&mut self, id: EntryId) {
        if let Some(entry) = self.entries.remove(&id) {
            info!(
                "Evicting entry ({} bytes): {}",
                entry.size,
                entry.payload.stref()
            );
            if let Some(bucket) = self.buckets.get_mut(&entry.fingerprint) {
                bucket.retain(|&other| other != id);
                if bucket.is_empty() {
                    self.buckets.remove(&entry.fingerprint);
                }
            }
            self.current_size -= entry.size;
        }
    }

    pub fn current_size(&self) -> usize {
        self.current_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// The subsumption predicate: does the stored `payload` cover `query`
/// spatially, temporally and by resolution?
///
/// Spatial containment is checked with half a pixel of slack per side because
/// producers round outward to whole pixels; without it, exact reprojection
/// queries would always miss. Gridded payloads additionally must fall within
/// one octave of the requested resolution: the stored pixels covering the
/// query must number at least `(xres, yres)` and strictly less than twice
/// that per axis.
pub(super) fn matches<T>(
    query: &QueryRectangle,
    payload: &T,
    temporal_bound: TemporalBound,
) -> Result<bool>
where
    T: QueryResult,
{
    let stref = payload.stref();

    ensure!(
        stref.time_type == TimeType::Unix,
        error::CacheInvalidTimeType {
            time_type: stref.time_type,
        }
    );

    if query.crs != stref.crs {
        return Ok(false);
    }

    let (h_spacing, v_spacing) = match payload.grid_shape() {
        Some((width, height)) => (
            stref.span_x() / f64::from(width) / 2.0,
            stref.span_y() / f64::from(height) / 2.0,
        ),
        None => (0.0, 0.0),
    };

    let spatially_contained = query.x1 >= stref.x1 - h_spacing
        && query.x2 <= stref.x2 + h_spacing
        && query.y1 >= stref.y1 - v_spacing
        && query.y2 <= stref.y2 + v_spacing;

    if !spatially_contained || !stref.time.contains(query.timestamp, temporal_bound) {
        return Ok(false);
    }

    if let Some((width, height)) = payload.grid_shape() {
        let h_fact = (query.x2 - query.x1) / stref.span_x();
        let v_fact = (query.y2 - query.y1) / stref.span_y();

        let clip_width = f64::from(width) * h_fact;
        let clip_height = f64::from(height) * v_fact;

        Ok(clip_width >= f64::from(query.xres)
            && clip_height >= f64::from(query.yres)
            && clip_width < 2.0 * f64::from(query.xres)
            && clip_height < 2.0 * f64::from(query.yres))
    } else {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::policy::PolicyKind;
    use geoproc_datatypes::plots::Plot;
    use geoproc_datatypes::primitives::{
        CrsId, SpatioTemporalReference, TimeInterval,
    };
    use geoproc_datatypes::raster::{GenericRaster, Grid, Raster};

    fn stref(x1: f64, y1: f64, x2: f64, y2: f64, t1: f64, t2: f64) -> SpatioTemporalReference {
        SpatioTemporalReference::new(
            CrsId::WGS84,
            x1,
            y1,
            x2,
            y2,
            TimeInterval::new(t1, t2).unwrap(),
            TimeType::Unix,
        )
    }

    fn raster(
        bounds: (f64, f64, f64, f64),
        width: u32,
        height: u32,
        time: (f64, f64),
    ) -> GenericRaster {
        GenericRaster::U8(Raster::new(
            stref(bounds.0, bounds.1, bounds.2, bounds.3, time.0, time.1),
            Grid::filled(width, height, 0_u8, None),
        ))
    }

    fn query(bounds: (f64, f64, f64, f64), timestamp: f64, res: u32) -> QueryRectangle {
        QueryRectangle::new(
            CrsId::WGS84,
            bounds.0,
            bounds.1,
            bounds.2,
            bounds.3,
            timestamp,
            res,
            res,
        )
        .unwrap()
    }

    fn plot_of_size(payload_bytes: usize) -> Plot {
        Plot::new(
            stref(0.0, 0.0, 1.0, 1.0, 0.0, 100.0),
            "x".repeat(payload_bytes),
        )
    }

    fn cache<T: QueryResult>(max_size: usize) -> StCache<T> {
        StCache::new(max_size, PolicyKind::Lru.create(), TemporalBound::Closed)
    }

    #[test]
    fn hit_returns_a_distinct_allocation() {
        let plot = plot_of_size(100);
        let mut cache = cache::<Plot>(plot.byte_size() * 10);

        cache.put("fp", &plot).unwrap();
        let hit = cache
            .get("fp", &query((0.0, 0.0, 1.0, 1.0), 50.0, 1))
            .unwrap()
            .unwrap();

        assert_eq!(hit, plot);
        assert_ne!(hit.payload.as_ptr(), plot.payload.as_ptr());
    }

    #[test]
    fn oversize_entries_are_dropped() {
        let plot = plot_of_size(2000);
        let mut cache = cache::<Plot>(1000);

        cache.put("fp", &plot).unwrap();

        assert_eq!(cache.current_size(), 0);
        assert!(cache
            .get("fp", &query((0.0, 0.0, 1.0, 1.0), 50.0, 1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn lru_evicts_the_oldest_fingerprint() {
        let plot = plot_of_size(100);
        let size = plot.byte_size();
        // room for two entries plus a little slack
        let mut cache = cache::<Plot>(size * 2 + 17);

        cache.put("a", &plot).unwrap();
        cache.put("b", &plot).unwrap();
        cache.put("c", &plot).unwrap();

        let q = query((0.0, 0.0, 1.0, 1.0), 50.0, 1);
        assert!(cache.get("a", &q).unwrap().is_none());
        assert!(cache.get("b", &q).unwrap().is_some());
        assert!(cache.get("c", &q).unwrap().is_some());
        assert_eq!(cache.current_size(), size * 2);
        assert_eq!(cache.entry_count(), 2);
    }

    #[test]
    fn accounting_tracks_every_entry() {
        let small = plot_of_size(10);
        let large = plot_of_size(500);
        let mut cache = cache::<Plot>(10_000);

        cache.put("a", &small).unwrap();
        cache.put("a", &large).unwrap();
        cache.put("b", &small).unwrap();

        assert_eq!(
            cache.current_size(),
            small.byte_size() * 2 + large.byte_size()
        );
        assert_eq!(cache.entry_count(), 3);
        assert!(cache.current_size() <= cache.max_size());
    }

    #[test]
    fn half_pixel_slack_allows_outward_rounding() {
        // 100x100 pixels over [0,10]x[0,10]: pixel size 0.1
        let stored = raster((0.0, 0.0, 10.0, 10.0), 100, 100, (0.0, 100.0));
        let mut cache = cache::<GenericRaster>(stored.byte_size() * 2);
        cache.put("fp", &stored).unwrap();

        // query extends 0.4 pixels past the stored bbox: inside the slack
        let inside = query((0.0, 0.0, 10.0 + 0.04, 10.0), 50.0, 100);
        assert!(cache.get("fp", &inside).unwrap().is_some());

        // 0.6 pixels past: outside the slack
        let outside = query((0.0, 0.0, 10.0 + 0.06, 10.0), 50.0, 100);
        assert!(cache.get("fp", &outside).unwrap().is_none());
    }

    #[test]
    fn resolution_must_be_within_one_octave() {
        let stored = raster((0.0, 0.0, 10.0, 10.0), 1000, 1000, (0.0, 100.0));
        let mut cache = cache::<GenericRaster>(stored.byte_size() * 2);
        cache.put("fp", &stored).unwrap();

        let full_bbox = (0.0, 0.0, 10.0, 10.0);

        // clipped pixel count 1000 >= 600 and < 1200: hit
        assert!(cache
            .get("fp", &query(full_bbox, 50.0, 600))
            .unwrap()
            .is_some());

        // stored resolution is too coarse
        assert!(cache
            .get("fp", &query(full_bbox, 50.0, 1001))
            .unwrap()
            .is_none());

        // stored resolution is more than twice as fine as requested
        assert!(cache
            .get("fp", &query(full_bbox, 50.0, 400))
            .unwrap()
            .is_none());
    }

    #[test]
    fn temporal_containment_is_closed_by_default() {
        let stored = raster((0.0, 0.0, 10.0, 10.0), 10, 10, (0.0, 100.0));
        let mut cache = cache::<GenericRaster>(stored.byte_size() * 2);
        cache.put("fp", &stored).unwrap();

        let q = |t| query((0.0, 0.0, 10.0, 10.0), t, 10);
        assert!(cache.get("fp", &q(100.0)).unwrap().is_some());
        assert!(cache.get("fp", &q(100.5)).unwrap().is_none());
    }

    #[test]
    fn half_open_temporal_bound_rejects_the_upper_end() {
        let stored = raster((0.0, 0.0, 10.0, 10.0), 10, 10, (0.0, 100.0));
        let mut cache: StCache<GenericRaster> = StCache::new(
            stored.byte_size() * 2,
            PolicyKind::Lru.create(),
            TemporalBound::HalfOpen,
        );
        cache.put("fp", &stored).unwrap();

        let q = |t| query((0.0, 0.0, 10.0, 10.0), t, 10);
        assert!(cache.get("fp", &q(99.9)).unwrap().is_some());
        assert!(cache.get("fp", &q(100.0)).unwrap().is_none());
    }

    #[test]
    fn crs_mismatch_misses() {
        let stored = raster((0.0, 0.0, 10.0, 10.0), 10, 10, (0.0, 100.0));
        let mut cache = cache::<GenericRaster>(stored.byte_size() * 2);
        cache.put("fp", &stored).unwrap();

        let q = QueryRectangle::new(
            CrsId::WEB_MERCATOR,
            0.0,
            0.0,
            10.0,
            10.0,
            50.0,
            10,
            10,
        )
        .unwrap();
        assert!(cache.get("fp", &q).unwrap().is_none());
    }

    #[test]
    fn non_unix_stored_time_is_an_invariant_violation() {
        let mut stored = plot_of_size(10);
        stored.stref.time_type = TimeType::Calendar;

        let mut cache = cache::<Plot>(10_000);
        cache.put("fp", &stored).unwrap();

        assert!(matches!(
            cache.get("fp", &query((0.0, 0.0, 1.0, 1.0), 50.0, 1)),
            Err(Error::CacheInvalidTimeType { .. })
        ));
    }
}
