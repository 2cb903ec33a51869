use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use geoproc_datatypes::call_on_generic_raster;
use geoproc_datatypes::primitives::QueryRectangle;
use geoproc_datatypes::raster::{GenericRaster, Pixel, Raster};

use crate::engine::{OperatorKernel, OperatorSources, QueryContext, QueryProfiler};
use crate::util::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalingMode {
    Scale,
    Unscale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RasterScalingParams {
    pub slope: f64,
    pub offset: f64,
    #[serde(default = "RasterScalingParams::default_mode")]
    pub scaling_mode: ScalingMode,
}

impl RasterScalingParams {
    fn default_mode() -> ScalingMode {
        ScalingMode::Unscale
    }
}

/// Scales or unscales every pixel of its single raster input.
///
/// Unscaling applies `p_new = p_old * slope + offset`, scaling the inverse
/// `p_new = (p_old - offset) / slope`. No-data pixels pass through untouched.
#[derive(Debug)]
pub struct RasterScaling {
    params: RasterScalingParams,
    sources: OperatorSources,
}

impl RasterScaling {
    pub fn new(params: RasterScalingParams, sources: OperatorSources) -> Result<Self> {
        sources.assume(1, 0, 0, 0)?;
        Ok(Self { params, sources })
    }

    fn apply(&self, input: GenericRaster) -> GenericRaster {
        let slope = self.params.slope;
        let offset = self.params.offset;
        let mode = self.params.scaling_mode;

        fn transform<T: Pixel>(
            raster: Raster<T>,
            slope: f64,
            offset: f64,
            mode: ScalingMode,
        ) -> Raster<T> {
            let grid = raster.grid.map_pixels(|pixel| {
                let old: f64 = num_traits::cast(pixel).unwrap_or_default();
                let new = match mode {
                    ScalingMode::Unscale => old * slope + offset,
                    ScalingMode::Scale => (old - offset) / slope,
                };
                num_traits::cast(new).unwrap_or(pixel)
            });
            Raster::new(raster.stref, grid)
        }

        call_on_generic_raster!(input, raster => transform(raster, slope, offset, mode).into())
    }
}

#[async_trait]
impl OperatorKernel for RasterScaling {
    async fn raster(
        &self,
        query: &QueryRectangle,
        profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<GenericRaster> {
        let input = self
            .sources
            .raster_from_source(0, query, profiler, ctx)
            .await?;
        Ok(self.apply(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheManager;
    use crate::default_registry;
    use crate::error::Error;
    use geoproc_datatypes::primitives::CrsId;
    use std::sync::Arc;

    fn query() -> QueryRectangle {
        QueryRectangle::new(CrsId::WGS84, 0.0, 0.0, 4.0, 4.0, 100.0, 4, 4).unwrap()
    }

    fn graph(slope: f64, offset: f64) -> String {
        format!(
            r#"{{
                "type": "RasterScaling",
                "params": {{ "slope": {}, "offset": {} }},
                "sources": {{ "raster": [
                    {{ "type": "MockRasterSource", "params": {{ "value": 10, "dataType": "F64" }} }}
                ] }}
            }}"#,
            slope, offset
        )
    }

    #[tokio::test]
    async fn unscales_its_input() {
        let node = default_registry().from_json(&graph(2.0, 1.0)).unwrap();
        let ctx = QueryContext::new(Arc::new(CacheManager::nop()));

        let mut profiler = QueryProfiler::new();
        profiler.start_timer().unwrap();
        let raster = node
            .cached_raster(&query(), &mut profiler, &ctx)
            .await
            .unwrap();
        profiler.stop_timer().unwrap();

        match raster {
            GenericRaster::F64(raster) => {
                assert!(raster.grid.data().iter().all(|&v| v == 21.0));
            }
            _ => unreachable!(),
        }

        // the source's I/O cost bubbled up into the parent's total
        assert!(profiler.all_io > 0);
        assert_eq!(profiler.self_io, 0);
    }

    #[tokio::test]
    async fn requires_exactly_one_raster_source() {
        let result = default_registry()
            .from_json(r#"{"type":"RasterScaling","params":{"slope":1.0,"offset":0.0}}"#);

        assert!(matches!(
            result,
            Err(Error::InvalidNumberOfSources { .. })
        ));
    }
}
