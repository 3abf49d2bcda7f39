use std::collections::HashMap;
use std::str::FromStr;

use floe_common::{Error, Result};

use crate::dialect::Dialect;

pub const DEFAULT_FETCH_SIZE: usize = 1000;
pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_WRITE_RETRIES: u32 = 3;
pub const DEFAULT_POOL_MAX_CONNECTIONS: u32 = 3;
pub const DEFAULT_POOL_ACQUIRE_TIMEOUT_MS: u64 = 10_000;

/// How the writer binds a null typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullMode {
    /// Bind a type-specific default: zero for numerics, empty string for
    /// text, the current date/timestamp for temporal columns. This is the
    /// historical behaviour and almost certainly wrong for nullable
    /// target columns; it stays the default for compatibility.
    #[default]
    TypeDefault,
    /// Bind a true SQL NULL.
    SqlNull,
}

impl FromStr for NullMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(NullMode::TypeDefault),
            "null" => Ok(NullMode::SqlNull),
            other => Err(Error::InvalidOptions(format!("unknown write.null.mode `{other}`"))),
        }
    }
}

/// What happens when an automatic flush exhausts its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Surface the error to the caller of `write`.
    #[default]
    Propagate,
    /// Log the error and keep accepting rows. The failed batch is lost;
    /// callers needing durability must checkpoint externally.
    Drop,
}

impl FromStr for FlushMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "propagate" => Ok(FlushMode::Propagate),
            "drop" => Ok(FlushMode::Drop),
            other => Err(Error::InvalidOptions(format!("unknown write.flush.mode `{other}`"))),
        }
    }
}

/// Connection and scan options for one table binding.
///
/// Parsed from the key/value table metadata the host engine hands the
/// connector; no configuration file of its own.
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub database_type: Dialect,
    pub url: String,
    /// Table reference; mutually exclusive with `query`.
    pub table: Option<String>,
    /// Explicit base query; mutually exclusive with `table`.
    pub query: Option<String>,
    /// Column used for range splitting, if any.
    pub split_column: Option<String>,
    /// Requested number of offset splits.
    pub split_count: usize,
    /// Rows per streaming round-trip.
    pub fetch_size: usize,
    /// Writer buffer threshold.
    pub batch_size: usize,
    /// Flush attempts before a batch is abandoned.
    pub write_retries: u32,
    pub null_mode: NullMode,
    pub flush_mode: FlushMode,
    pub pool_max_connections: u32,
    pub pool_acquire_timeout_ms: u64,
}

impl TableOptions {
    /// Parse table properties supplied by the host engine.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let database_type = match props.get("database.type") {
            Some(raw) => raw.parse::<Dialect>()?,
            None => Dialect::Generic,
        };
        let url = props
            .get("url")
            .cloned()
            .ok_or_else(|| Error::InvalidOptions("missing required property `url`".to_string()))?;

        let options = Self {
            database_type,
            url,
            table: props.get("table").cloned(),
            query: props.get("query").cloned(),
            split_column: props.get("split.column").cloned(),
            split_count: parse_or(props, "split.count", 1)?,
            fetch_size: parse_or(props, "fetch.size", DEFAULT_FETCH_SIZE)?,
            batch_size: parse_or(props, "batch.size", DEFAULT_BATCH_SIZE)?,
            write_retries: parse_or(props, "write.retries", DEFAULT_WRITE_RETRIES)?,
            null_mode: parse_or(props, "write.null.mode", NullMode::default())?,
            flush_mode: parse_or(props, "write.flush.mode", FlushMode::default())?,
            pool_max_connections: parse_or(props, "pool.max.connections", DEFAULT_POOL_MAX_CONNECTIONS)?,
            pool_acquire_timeout_ms: parse_or(
                props,
                "pool.acquire.timeout.ms",
                DEFAULT_POOL_ACQUIRE_TIMEOUT_MS,
            )?,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidOptions("`url` must not be empty".to_string()));
        }
        match (&self.table, &self.query) {
            (None, None) => {
                return Err(Error::InvalidOptions(
                    "either `table` or `query` must be specified".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(Error::InvalidOptions(
                    "cannot specify both `table` and `query`".to_string(),
                ));
            }
            _ => {}
        }
        if self.fetch_size == 0 {
            return Err(Error::InvalidOptions("`fetch.size` must be positive".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidOptions("`batch.size` must be positive".to_string()));
        }
        if self.write_retries == 0 {
            return Err(Error::InvalidOptions("`write.retries` must be positive".to_string()));
        }
        if self.pool_max_connections == 0 {
            return Err(Error::InvalidOptions(
                "`pool.max.connections` must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The base query every scan and probe wraps: the configured query,
    /// or `SELECT *` over the bound table.
    pub fn base_query(&self) -> String {
        match &self.query {
            Some(query) => query.trim().trim_end_matches(';').to_string(),
            None => format!("SELECT * FROM {}", self.table.as_deref().unwrap_or_default()),
        }
    }
}

fn parse_or<T: FromStr>(props: &HashMap<String, String>, key: &str, default: T) -> Result<T> {
    match props.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::InvalidOptions(format!("invalid value `{raw}` for `{key}`"))),
        None => Ok(default),
    }
}
