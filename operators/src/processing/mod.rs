mod raster_scaling;

pub use raster_scaling::{RasterScaling, RasterScalingParams, ScalingMode};

use crate::engine::OperatorRegistry;
use crate::util::parse_params;

pub fn register_operators(registry: &mut OperatorRegistry) {
    registry.register("RasterScaling", |params, sources| {
        Ok(Box::new(RasterScaling::new(
            parse_params("RasterScaling", params)?,
            sources,
        )?))
    });
}
