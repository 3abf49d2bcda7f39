use thiserror::Error;

/// Unified error type for Floe connector crates.
///
/// Each variant corresponds to one phase of the connector lifecycle, so a
/// caller can tell a planning-time failure apart from a mid-stream one.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("schema probe error: {0}")]
    Schema(String),
    #[error("count query error: {0}")]
    Count(String),
    #[error("range query error: {0}")]
    RangeQuery(String),
    #[error("read error: {0}")]
    Read(String),
    #[error("unsupported column type: {0}")]
    UnsupportedType(String),
    #[error("write flush error: {0}")]
    WriteFlush(String),
    #[error("invalid table options: {0}")]
    InvalidOptions(String),
}

pub type Result<T> = std::result::Result<T, Error>;
