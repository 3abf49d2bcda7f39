use std::str::FromStr;

use floe_common::{Error, Result};

use crate::codec;

/// SQL syntax variant for a database family.
///
/// The connector only abstracts the fragments that differ between
/// families: row limiting, limit+offset pagination, range filters and
/// bind-parameter placeholders. Everything else is plain SQL passed
/// through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Portable JDBC-style escape sequences, for drivers that translate
    /// `{LIMIT n OFFSET m}` themselves.
    Generic,
    MySql,
    Postgres,
    ClickHouse,
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "jdbc" => Ok(Dialect::Generic),
            "mysql" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "clickhouse" => Ok(Dialect::ClickHouse),
            other => Err(Error::InvalidOptions(format!("unknown database type `{other}`"))),
        }
    }
}

impl Dialect {
    /// Append row-limiting syntax to `query`.
    pub fn limit(&self, query: &str, limit: i64) -> String {
        match self {
            Dialect::Generic => format!("{query} {{LIMIT {limit}}}"),
            _ => format!("{query} LIMIT {limit}"),
        }
    }

    /// Append limit+offset pagination to `query`. A zero offset delegates
    /// to [`Dialect::limit`] so the simpler form is used where possible.
    pub fn limit_offset(&self, query: &str, limit: i64, offset: i64) -> String {
        if offset == 0 {
            return self.limit(query, limit);
        }
        match self {
            Dialect::Generic => format!("{query} {{LIMIT {limit} OFFSET {offset}}}"),
            Dialect::MySql | Dialect::ClickHouse => format!("{query} LIMIT {offset},{limit}"),
            Dialect::Postgres => format!("{query} LIMIT {limit} OFFSET {offset}"),
        }
    }

    /// Append a half-open range filter `column >= lower AND column < upper`.
    ///
    /// Integer-classified column types are inlined unquoted; every other
    /// type is quoted as a string literal with embedded quotes doubled.
    /// The bounds come from the database's own min/max probe, never from
    /// end-user input; see DESIGN.md for the injection considerations.
    pub fn range_filter(
        &self,
        query: &str,
        column_type: &str,
        column: &str,
        lower: &str,
        upper: &str,
    ) -> String {
        if codec::is_integer_type(column_type) {
            format!("{query} WHERE {column} >= {lower} AND {column} < {upper}")
        } else {
            format!(
                "{query} WHERE {column} >= '{}' AND {column} < '{}'",
                quote_escape(lower),
                quote_escape(upper)
            )
        }
    }

    /// Bind-parameter placeholder for 1-based position `position`.
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            Dialect::Postgres => format!("${position}"),
            _ => "?".to_string(),
        }
    }
}

fn quote_escape(value: &str) -> String {
    value.replace('\'', "''")
}
