use thiserror::Error;

/// A configuration problem caught before any socket or file I/O happens.
/// Every variant corresponds to a flag combination or value clap's own
/// parser cannot reject on its own.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `--port 0` was given.
    #[error("--port must not be 0")]
    ZeroPort,

    /// `--min-redundancy` was zero or negative.
    #[error("--min-redundancy must be a positive number of emissions")]
    ZeroMinRedundancy,

    /// `--loop 0` was given.
    #[error("--loop must request at least one pass")]
    ZeroLoopCount,

    /// `send --dest` named an absolute path.
    #[error("--dest for `send` must be a relative path, not {0:?}")]
    AbsoluteSendDest(String),

    /// `--addr`/`--port` did not resolve to a usable socket address.
    #[error("{0} is not a valid address: {1}")]
    InvalidAddr(String, String),
}
