//! Synthetic leaf operators for tests and demos

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use geoproc_datatypes::collections::{AttributeMap, PointCollection};
use geoproc_datatypes::primitives::{
    Coordinate2D, QueryRectangle, SpatioTemporalReference, TimeInterval,
};
use geoproc_datatypes::raster::{GenericRaster, Grid, Pixel, Raster, RasterDataType};

use crate::engine::{OperatorKernel, OperatorRegistry, QueryContext, QueryProfiler};
use crate::util::{parse_params, Result};

pub fn register_operators(registry: &mut OperatorRegistry) {
    registry.register("MockRasterSource", |params, sources| {
        sources.assume(0, 0, 0, 0)?;
        Ok(Box::new(MockRasterSource {
            params: parse_params("MockRasterSource", params)?,
        }))
    });
    registry.register("MockPointSource", |params, sources| {
        sources.assume(0, 0, 0, 0)?;
        Ok(Box::new(MockPointSource {
            params: parse_params("MockPointSource", params)?,
        }))
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MockRasterSourceParams {
    /// every pixel carries this value
    pub value: f64,
    #[serde(default = "MockRasterSourceParams::default_data_type")]
    pub data_type: RasterDataType,
    /// validity interval stamped on produced rasters; an instant at the
    /// query's timestamp when absent
    #[serde(default)]
    pub time: Option<TimeInterval>,
}

impl MockRasterSourceParams {
    fn default_data_type() -> RasterDataType {
        RasterDataType::U8
    }
}

/// A leaf that produces a constant raster at exactly the query's bounds and
/// resolution
#[derive(Debug)]
pub struct MockRasterSource {
    pub params: MockRasterSourceParams,
}

impl MockRasterSource {
    fn produce(&self, query: &QueryRectangle) -> GenericRaster {
        let time = self
            .params
            .time
            .unwrap_or_else(|| TimeInterval::instant(query.timestamp));
        let stref = SpatioTemporalReference::from_query(query, time);
        let value = self.params.value;

        fn fill<T: Pixel>(
            stref: SpatioTemporalReference,
            query: &QueryRectangle,
            value: f64,
        ) -> Raster<T> {
            let pixel = num_traits::cast(value).unwrap_or_else(T::zero);
            Raster::new(stref, Grid::filled(query.xres, query.yres, pixel, None))
        }

        match self.params.data_type {
            RasterDataType::U8 => GenericRaster::U8(fill(stref, query, value)),
            RasterDataType::U16 => GenericRaster::U16(fill(stref, query, value)),
            RasterDataType::U32 => GenericRaster::U32(fill(stref, query, value)),
            RasterDataType::I16 => GenericRaster::I16(fill(stref, query, value)),
            RasterDataType::I32 => GenericRaster::I32(fill(stref, query, value)),
            RasterDataType::F32 => GenericRaster::F32(fill(stref, query, value)),
            RasterDataType::F64 => GenericRaster::F64(fill(stref, query, value)),
        }
    }
}

#[async_trait]
impl OperatorKernel for MockRasterSource {
    async fn raster(
        &self,
        query: &QueryRectangle,
        profiler: &mut QueryProfiler,
        _ctx: &QueryContext,
    ) -> Result<GenericRaster> {
        let raster = self.produce(query);
        profiler.add_io_cost(raster.byte_size() as u64);
        Ok(raster)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MockPointSourceParams {
    pub coordinates: Vec<Coordinate2D>,
}

/// A leaf that produces a fixed set of points, stamped with the query's
/// bounds
#[derive(Debug)]
pub struct MockPointSource {
    pub params: MockPointSourceParams,
}

#[async_trait]
impl OperatorKernel for MockPointSource {
    async fn points(
        &self,
        query: &QueryRectangle,
        profiler: &mut QueryProfiler,
        _ctx: &QueryContext,
    ) -> Result<PointCollection> {
        let stref = SpatioTemporalReference::from_query(
            query,
            TimeInterval::instant(query.timestamp),
        );
        let collection = PointCollection::new(
            stref,
            self.params.coordinates.clone(),
            vec![],
            AttributeMap::new(),
        )?;
        profiler.add_io_cost(collection.byte_size() as u64);
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheManager;
    use crate::default_registry;
    use crate::error::Error;
    use geoproc_datatypes::primitives::CrsId;
    use geoproc_datatypes::results::ResultKind;
    use std::sync::Arc;

    fn query() -> QueryRectangle {
        QueryRectangle::new(CrsId::WGS84, 0.0, 0.0, 8.0, 4.0, 100.0, 8, 4).unwrap()
    }

    fn ctx() -> QueryContext {
        QueryContext::new(Arc::new(CacheManager::nop()))
    }

    #[tokio::test]
    async fn raster_source_fills_the_query() {
        let node = default_registry()
            .from_json(r#"{"type":"MockRasterSource","params":{"value":7,"dataType":"U16"}}"#)
            .unwrap();

        let mut profiler = QueryProfiler::new();
        profiler.start_timer().unwrap();
        let raster = node
            .cached_raster(&query(), &mut profiler, &ctx())
            .await
            .unwrap();
        profiler.stop_timer().unwrap();

        assert_eq!(raster.width(), 8);
        assert_eq!(raster.height(), 4);
        assert_eq!(raster.data_type(), RasterDataType::U16);
        match raster {
            GenericRaster::U16(raster) => assert!(raster.grid.data().iter().all(|&v| v == 7)),
            _ => unreachable!(),
        }
        assert!(profiler.all_io > 0);
    }

    #[tokio::test]
    async fn point_source_returns_its_coordinates() {
        let node = default_registry()
            .from_json(
                r#"{"type":"MockPointSource","params":{"coordinates":[{"x":1.0,"y":2.0},{"x":3.0,"y":4.0}]}}"#,
            )
            .unwrap();

        let mut profiler = QueryProfiler::new();
        profiler.start_timer().unwrap();
        let points = node
            .cached_points(&query(), &mut profiler, &ctx())
            .await
            .unwrap();
        profiler.stop_timer().unwrap();

        assert_eq!(points.feature_count(), 2);
        assert_eq!(points.coordinates[1], Coordinate2D::new(3.0, 4.0));
    }

    #[tokio::test]
    async fn wrong_result_kind_is_rejected() {
        let node = default_registry()
            .from_json(r#"{"type":"MockPointSource","params":{"coordinates":[]}}"#)
            .unwrap();

        let mut profiler = QueryProfiler::new();
        profiler.start_timer().unwrap();
        let result = node.cached_raster(&query(), &mut profiler, &ctx()).await;

        assert!(matches!(
            result,
            Err(Error::DoesNotProduce {
                kind: ResultKind::Raster
            })
        ));
    }

    #[test]
    fn unknown_param_keys_are_rejected() {
        let result = default_registry()
            .from_json(r#"{"type":"MockRasterSource","params":{"value":1,"extra":true}}"#);

        assert!(matches!(
            result,
            Err(Error::InvalidOperatorParams { .. })
        ));
    }
}
