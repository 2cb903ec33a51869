use async_trait::async_trait;
use log::debug;

use geoproc_datatypes::collections::{LineCollection, PointCollection, PolygonCollection};
use geoproc_datatypes::plots::Plot;
use geoproc_datatypes::primitives::QueryRectangle;
use geoproc_datatypes::raster::GenericRaster;
use geoproc_datatypes::results::ResultKind;

use crate::error::Error;
use crate::util::Result;

use super::{QueryContext, QueryProfiler};

/// The producing side of an operator: one `produce` method per result kind it
/// can yield.
///
/// Kernels must be reentrant; a node may be evaluated concurrently from
/// distinct top-level requests.
#[async_trait]
pub trait OperatorKernel: Send + Sync + std::fmt::Debug {
    async fn raster(
        &self,
        _query: &QueryRectangle,
        _profiler: &mut QueryProfiler,
        _ctx: &QueryContext,
    ) -> Result<GenericRaster> {
        Err(Error::DoesNotProduce {
            kind: ResultKind::Raster,
        })
    }

    async fn points(
        &self,
        _query: &QueryRectangle,
        _profiler: &mut QueryProfiler,
        _ctx: &QueryContext,
    ) -> Result<PointCollection> {
        Err(Error::DoesNotProduce {
            kind: ResultKind::Points,
        })
    }

    async fn lines(
        &self,
        _query: &QueryRectangle,
        _profiler: &mut QueryProfiler,
        _ctx: &QueryContext,
    ) -> Result<LineCollection> {
        Err(Error::DoesNotProduce {
            kind: ResultKind::Lines,
        })
    }

    async fn polygons(
        &self,
        _query: &QueryRectangle,
        _profiler: &mut QueryProfiler,
        _ctx: &QueryContext,
    ) -> Result<PolygonCollection> {
        Err(Error::DoesNotProduce {
            kind: ResultKind::Polygons,
        })
    }

    async fn plot(
        &self,
        _query: &QueryRectangle,
        _profiler: &mut QueryProfiler,
        _ctx: &QueryContext,
    ) -> Result<Plot> {
        Err(Error::DoesNotProduce {
            kind: ResultKind::Plot,
        })
    }
}

/// One vertex of a parsed operator graph: the kernel plus the identity the
/// cache keys on.
///
/// The `cached_*` methods are the evaluation dispatcher: they wrap the
/// kernel's production in a cache lookup keyed by the node's semantic id and
/// attribute the spent cost to a fresh profiler whose total is merged into
/// the parent's.
#[derive(Debug)]
pub struct OperatorNode {
    op_type: String,
    semantic_id: String,
    depth: usize,
    kernel: Box<dyn OperatorKernel>,
}

impl OperatorNode {
    pub(crate) fn new(
        op_type: String,
        semantic_id: String,
        depth: usize,
        kernel: Box<dyn OperatorKernel>,
    ) -> Self {
        Self {
            op_type,
            semantic_id,
            depth,
            kernel,
        }
    }

    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    /// A deterministic identifier of this subtree up to structural and
    /// parametric equality; the cache's fingerprint
    pub fn semantic_id(&self) -> &str {
        &self.semantic_id
    }

    pub async fn cached_raster(
        &self,
        query: &QueryRectangle,
        parent_profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<GenericRaster> {
        let mut profiler = QueryProfiler::new();
        profiler.start_timer()?;
        let result = ctx
            .cache()
            .get_or_compute(&self.semantic_id, query, || {
                self.kernel.raster(query, &mut profiler, ctx)
            })
            .await;
        profiler.stop_timer()?;
        self.log_profile("raster", &profiler);
        parent_profiler.add_child(&profiler)?;
        result
    }

    pub async fn cached_points(
        &self,
        query: &QueryRectangle,
        parent_profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<PointCollection> {
        let mut profiler = QueryProfiler::new();
        profiler.start_timer()?;
        let result = ctx
            .cache()
            .get_or_compute(&self.semantic_id, query, || {
                self.kernel.points(query, &mut profiler, ctx)
            })
            .await;
        profiler.stop_timer()?;
        self.log_profile("points", &profiler);
        parent_profiler.add_child(&profiler)?;
        result
    }

    pub async fn cached_lines(
        &self,
        query: &QueryRectangle,
        parent_profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<LineCollection> {
        let mut profiler = QueryProfiler::new();
        profiler.start_timer()?;
        let result = ctx
            .cache()
            .get_or_compute(&self.semantic_id, query, || {
                self.kernel.lines(query, &mut profiler, ctx)
            })
            .await;
        profiler.stop_timer()?;
        self.log_profile("lines", &profiler);
        parent_profiler.add_child(&profiler)?;
        result
    }

    pub async fn cached_polygons(
        &self,
        query: &QueryRectangle,
        parent_profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<PolygonCollection> {
        let mut profiler = QueryProfiler::new();
        profiler.start_timer()?;
        let result = ctx
            .cache()
            .get_or_compute(&self.semantic_id, query, || {
                self.kernel.polygons(query, &mut profiler, ctx)
            })
            .await;
        profiler.stop_timer()?;
        self.log_profile("polygons", &profiler);
        parent_profiler.add_child(&profiler)?;
        result
    }

    pub async fn cached_plot(
        &self,
        query: &QueryRectangle,
        parent_profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<Plot> {
        let mut profiler = QueryProfiler::new();
        profiler.start_timer()?;
        let result = ctx
            .cache()
            .get_or_compute(&self.semantic_id, query, || {
                self.kernel.plot(query, &mut profiler, ctx)
            })
            .await;
        profiler.stop_timer()?;
        self.log_profile("plot", &profiler);
        parent_profiler.add_child(&profiler)?;
        result
    }

    fn log_profile(&self, kind: &str, profiler: &QueryProfiler) {
        debug!(
            "{:indent$}OP {} {} CPU: {:.4}/{:.4} GPU: {:.4}/{:.4} I/O: {}/{}",
            "",
            self.op_type,
            kind,
            profiler.self_cpu,
            profiler.all_cpu,
            profiler.self_gpu,
            profiler.all_gpu,
            profiler.self_io,
            profiler.all_io,
            indent = self.depth
        );
    }
}

/// A kernel's children, grouped by input kind.
///
/// The `*_from_source` helpers pause the calling kernel's timer while the
/// child runs, so the spent time shows up as the child's self-cost and only
/// counts toward the caller's total.
#[derive(Debug, Default)]
pub struct OperatorSources {
    pub raster: Vec<OperatorNode>,
    pub points: Vec<OperatorNode>,
    pub lines: Vec<OperatorNode>,
    pub polygons: Vec<OperatorNode>,
}

impl OperatorSources {
    pub fn total_count(&self) -> usize {
        self.raster.len() + self.points.len() + self.lines.len() + self.polygons.len()
    }

    /// Validates the exact number of sources per input kind
    pub fn assume(
        &self,
        raster: usize,
        points: usize,
        lines: usize,
        polygons: usize,
    ) -> Result<()> {
        let checks = [
            (ResultKind::Raster, raster, self.raster.len()),
            (ResultKind::Points, points, self.points.len()),
            (ResultKind::Lines, lines, self.lines.len()),
            (ResultKind::Polygons, polygons, self.polygons.len()),
        ];
        for (kind, expected, found) in checks {
            if expected != found {
                return Err(Error::InvalidNumberOfSources {
                    kind,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    pub async fn raster_from_source(
        &self,
        index: usize,
        query: &QueryRectangle,
        profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<GenericRaster> {
        let source = self.raster.get(index).ok_or(Error::InvalidSourceIndex {
            kind: ResultKind::Raster,
            index,
        })?;
        profiler.stop_timer()?;
        let result = source.cached_raster(query, profiler, ctx).await;
        profiler.start_timer()?;
        result
    }

    pub async fn points_from_source(
        &self,
        index: usize,
        query: &QueryRectangle,
        profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<PointCollection> {
        let source = self.points.get(index).ok_or(Error::InvalidSourceIndex {
            kind: ResultKind::Points,
            index,
        })?;
        profiler.stop_timer()?;
        let result = source.cached_points(query, profiler, ctx).await;
        profiler.start_timer()?;
        result
    }

    pub async fn lines_from_source(
        &self,
        index: usize,
        query: &QueryRectangle,
        profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<LineCollection> {
        let source = self.lines.get(index).ok_or(Error::InvalidSourceIndex {
            kind: ResultKind::Lines,
            index,
        })?;
        profiler.stop_timer()?;
        let result = source.cached_lines(query, profiler, ctx).await;
        profiler.start_timer()?;
        result
    }

    pub async fn polygons_from_source(
        &self,
        index: usize,
        query: &QueryRectangle,
        profiler: &mut QueryProfiler,
        ctx: &QueryContext,
    ) -> Result<PolygonCollection> {
        let source = self.polygons.get(index).ok_or(Error::InvalidSourceIndex {
            kind: ResultKind::Polygons,
            index,
        })?;
        profiler.stop_timer()?;
        let result = source.cached_polygons(query, profiler, ctx).await;
        profiler.start_timer()?;
        result
    }
}
