use geoproc_datatypes::primitives::TimeType;
use geoproc_datatypes::results::ResultKind;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub enum Error {
    #[snafu(display("DataType error: {}", source))]
    DataType {
        source: geoproc_datatypes::error::Error,
    },

    #[snafu(display("Unable to parse operator graph: {}", source))]
    GraphJson { source: serde_json::Error },

    #[snafu(display("Operator graph node must be a JSON object"))]
    GraphNodeNotAnObject,

    #[snafu(display("Operator graph node is missing the \"type\" field"))]
    MissingOperatorType,

    #[snafu(display("Unexpected key \"{}\" in operator graph node", key))]
    UnexpectedGraphKey { key: String },

    #[snafu(display("Unknown operator type: \"{}\"", op_type))]
    UnknownOperatorType { op_type: String },

    #[snafu(display("Unknown source kind \"{}\"", kind))]
    UnknownSourceKind { kind: String },

    #[snafu(display("The \"sources\" field must be an object keyed by input kind"))]
    SourcesNotAnObject,

    #[snafu(display("Sources of kind \"{}\" must be an array", kind))]
    SourcesNotAnArray { kind: String },

    #[snafu(display("Operator has more than {} sources", max))]
    TooManySources { max: usize },

    #[snafu(display("Invalid parameters for operator \"{}\": {}", op_type, source))]
    InvalidOperatorParams {
        op_type: String,
        source: serde_json::Error,
    },

    #[snafu(display(
        "Operator expects {} {} sources, found {}",
        expected,
        kind,
        found
    ))]
    InvalidNumberOfSources {
        kind: ResultKind,
        expected: usize,
        found: usize,
    },

    #[snafu(display("Operator does not produce {} results", kind))]
    DoesNotProduce { kind: ResultKind },

    #[snafu(display("Invalid {} source index: {}", kind, index))]
    InvalidSourceIndex { kind: ResultKind, index: usize },

    #[snafu(display("Profiler timer started twice"))]
    TimerAlreadyRunning,

    #[snafu(display("Profiler timer stopped while not running"))]
    TimerNotRunning,

    #[snafu(display("Merged a profiler whose timer is still running"))]
    TimerStillRunning,

    #[snafu(display("Cache only accepts results with unix timestamps, got {:?}", time_type))]
    CacheInvalidTimeType { time_type: TimeType },

    #[snafu(display("Cache is over budget but has nothing left to evict"))]
    CacheOverfull,
}

impl From<geoproc_datatypes::error::Error> for Error {
    fn from(source: geoproc_datatypes::error::Error) -> Self {
        Self::DataType { source }
    }
}
