mod graph;
mod operator;
mod query_context;
mod query_profiler;

pub use graph::{OperatorRegistry, MAX_SOURCES};
pub use operator::{OperatorKernel, OperatorNode, OperatorSources};
pub use query_context::QueryContext;
pub use query_profiler::QueryProfiler;
