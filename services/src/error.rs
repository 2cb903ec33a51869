use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub enum Error {
    DataType {
        source: geoproc_datatypes::error::Error,
    },

    Operator {
        source: geoproc_operators::error::Error,
    },

    Io {
        source: std::io::Error,
    },

    #[snafu(display("Configuration error: {}", source))]
    Config {
        source: config::ConfigError,
    },

    ConfigLockFailed,

    Logger {
        source: flexi_logger::FlexiLoggerError,
    },

    TokioJoin {
        source: tokio::task::JoinError,
    },

    #[snafu(display("Unknown command code: {}", command))]
    UnknownCommand {
        command: u8,
    },

    #[snafu(display("Unknown response status: {}", status))]
    UnknownResponseStatus {
        status: u8,
    },

    #[snafu(display(
        "Declared graph length of {} bytes exceeds the {} byte limit",
        len,
        max
    ))]
    GraphTooLarge {
        len: usize,
        max: usize,
    },
}

impl From<geoproc_datatypes::error::Error> for Error {
    fn from(source: geoproc_datatypes::error::Error) -> Self {
        Self::DataType { source }
    }
}

impl From<geoproc_operators::error::Error> for Error {
    fn from(source: geoproc_operators::error::Error) -> Self {
        Self::Operator { source }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

impl From<flexi_logger::FlexiLoggerError> for Error {
    fn from(source: flexi_logger::FlexiLoggerError) -> Self {
        Self::Logger { source }
    }
}
