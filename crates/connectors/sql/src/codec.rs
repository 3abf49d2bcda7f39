//! Bidirectional coercion between native column types and typed values.
//!
//! The native-type world is closed on purpose: a column type that does not
//! map onto one of the supported kinds fails with
//! [`Error::UnsupportedType`] instead of being passed through and
//! corrupting downstream processing. The read and write directions cover
//! the identical set.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::{Any, Row, ValueRef};

use floe_common::{Error, Result, TypedValue};

use crate::options::NullMode;

pub type AnyQuery<'q> = sqlx::query::Query<'q, Any, AnyArguments<'q>>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// The broad families the closed native-type world collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Date,
    Timestamp,
    Decimal,
}

impl NativeKind {
    pub fn is_integer(&self) -> bool {
        matches!(self, NativeKind::Int8 | NativeKind::Int16 | NativeKind::Int32 | NativeKind::Int64)
    }
}

/// Classify a native type name reported by a driver.
///
/// ClickHouse-style names are matched case-sensitively first, because the
/// case-folded SQL synonyms collide with them (Postgres `INT8` is a
/// 64-bit column, ClickHouse `Int8` an 8-bit one).
pub fn native_kind(native_type: &str) -> Result<NativeKind> {
    match native_type {
        "Int8" | "UInt8" => return Ok(NativeKind::Int8),
        "Int16" | "UInt16" => return Ok(NativeKind::Int16),
        "Int32" | "UInt32" => return Ok(NativeKind::Int32),
        "Int64" | "UInt64" => return Ok(NativeKind::Int64),
        "Float32" => return Ok(NativeKind::Float32),
        "Float64" => return Ok(NativeKind::Float64),
        "String" => return Ok(NativeKind::Utf8),
        "DateTime" => return Ok(NativeKind::Timestamp),
        _ => {}
    }
    let upper = native_type.to_ascii_uppercase();
    // Decimal names carry precision and scale, e.g. DECIMAL(18, 4).
    if upper.starts_with("DECIMAL") || upper.starts_with("NUMERIC") {
        return Ok(NativeKind::Decimal);
    }
    match upper.as_str() {
        "TINYINT" => Ok(NativeKind::Int8),
        "SMALLINT" | "INT2" => Ok(NativeKind::Int16),
        "INT" | "INTEGER" | "INT4" | "MEDIUMINT" => Ok(NativeKind::Int32),
        "BIGINT" | "LONG" | "INT8" => Ok(NativeKind::Int64),
        "FLOAT" | "REAL" | "FLOAT4" => Ok(NativeKind::Float32),
        "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => Ok(NativeKind::Float64),
        "TEXT" | "VARCHAR" | "CHAR" | "CHARACTER VARYING" | "NVARCHAR" | "CLOB" => {
            Ok(NativeKind::Utf8)
        }
        "DATE" => Ok(NativeKind::Date),
        "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" => Ok(NativeKind::Timestamp),
        _ => Err(Error::UnsupportedType(native_type.to_string())),
    }
}

/// Whether range-filter literals for this type may be inlined unquoted.
pub fn is_integer_type(native_type: &str) -> bool {
    native_kind(native_type).map(|k| k.is_integer()).unwrap_or(false)
}

/// Read direction: decode column `index` of a fetched row according to
/// its declared native type. A database NULL becomes [`TypedValue::Null`],
/// never a zeroed value.
pub fn decode_value(row: &AnyRow, index: usize, native_type: &str) -> Result<TypedValue> {
    let kind = native_kind(native_type)?;
    let raw = row
        .try_get_raw(index)
        .map_err(|e| Error::Read(format!("column {index}: {e}")))?;
    if raw.is_null() {
        return Ok(TypedValue::Null);
    }
    match kind {
        NativeKind::Int8 => Ok(TypedValue::Int8(get::<i64>(row, index)? as i8)),
        NativeKind::Int16 => Ok(TypedValue::Int16(get::<i64>(row, index)? as i16)),
        NativeKind::Int32 => Ok(TypedValue::Int32(get::<i64>(row, index)? as i32)),
        NativeKind::Int64 => Ok(TypedValue::Int64(get::<i64>(row, index)?)),
        NativeKind::Float32 => Ok(TypedValue::Float32(get_float(row, index)? as f32)),
        NativeKind::Float64 => Ok(TypedValue::Float64(get_float(row, index)?)),
        NativeKind::Utf8 => Ok(TypedValue::Utf8(get::<String>(row, index)?)),
        NativeKind::Date => parse_date(&get::<String>(row, index)?).map(TypedValue::Date),
        NativeKind::Timestamp => {
            parse_timestamp(&get::<String>(row, index)?).map(TypedValue::Timestamp)
        }
        NativeKind::Decimal => decode_decimal(row, index).map(TypedValue::Decimal),
    }
}

/// Write direction: bind `value` into the next parameter slot of `query`,
/// converted to the representation the declared target type expects.
///
/// Null handling follows `null_mode`: [`NullMode::TypeDefault`]
/// substitutes a type-specific default, [`NullMode::SqlNull`] binds true
/// SQL NULL.
pub fn bind_value<'q>(
    query: AnyQuery<'q>,
    native_type: &str,
    value: &TypedValue,
    null_mode: NullMode,
) -> Result<AnyQuery<'q>> {
    let kind = native_kind(native_type)?;
    if value.is_null() {
        return match null_mode {
            NullMode::SqlNull => Ok(bind_sql_null(query, kind)),
            NullMode::TypeDefault => bind_concrete(query, kind, &null_default(kind)),
        };
    }
    bind_concrete(query, kind, value)
}

/// The value substituted for NULL under [`NullMode::TypeDefault`].
pub fn null_default(kind: NativeKind) -> TypedValue {
    match kind {
        NativeKind::Int8 => TypedValue::Int8(0),
        NativeKind::Int16 => TypedValue::Int16(0),
        NativeKind::Int32 => TypedValue::Int32(0),
        NativeKind::Int64 => TypedValue::Int64(0),
        NativeKind::Float32 => TypedValue::Float32(0.0),
        NativeKind::Float64 => TypedValue::Float64(0.0),
        NativeKind::Utf8 => TypedValue::Utf8(String::new()),
        NativeKind::Date => TypedValue::Date(Utc::now().date_naive()),
        NativeKind::Timestamp => TypedValue::Timestamp(Utc::now().naive_utc()),
        NativeKind::Decimal => TypedValue::Decimal(Decimal::ZERO),
    }
}

fn bind_concrete<'q>(query: AnyQuery<'q>, kind: NativeKind, value: &TypedValue) -> Result<AnyQuery<'q>> {
    let query = match kind {
        NativeKind::Int8 | NativeKind::Int16 => query.bind(int_value(value)? as i16),
        NativeKind::Int32 => query.bind(int_value(value)? as i32),
        NativeKind::Int64 => query.bind(int_value(value)?),
        NativeKind::Float32 => query.bind(float_value(value)? as f32),
        NativeKind::Float64 => query.bind(float_value(value)?),
        NativeKind::Utf8 => query.bind(text_value(value)?),
        NativeKind::Date => query.bind(render_date(value)?),
        NativeKind::Timestamp => query.bind(render_timestamp(value)?),
        NativeKind::Decimal => query.bind(render_decimal(value)?),
    };
    Ok(query)
}

fn bind_sql_null<'q>(query: AnyQuery<'q>, kind: NativeKind) -> AnyQuery<'q> {
    match kind {
        NativeKind::Int8 | NativeKind::Int16 => query.bind(None::<i16>),
        NativeKind::Int32 => query.bind(None::<i32>),
        NativeKind::Int64 => query.bind(None::<i64>),
        NativeKind::Float32 => query.bind(None::<f32>),
        NativeKind::Float64 => query.bind(None::<f64>),
        NativeKind::Utf8 | NativeKind::Date | NativeKind::Timestamp | NativeKind::Decimal => {
            query.bind(None::<String>)
        }
    }
}

fn get<'r, T>(row: &'r AnyRow, index: usize) -> Result<T>
where
    T: sqlx::Decode<'r, Any> + sqlx::Type<Any>,
{
    row.try_get::<T, _>(index)
        .map_err(|e| Error::Read(format!("column {index}: {e}")))
}

// Float columns surface as either 4- or 8-byte values depending on the
// driver, so try the wide decode first.
fn get_float(row: &AnyRow, index: usize) -> Result<f64> {
    match row.try_get::<f64, _>(index) {
        Ok(v) => Ok(v),
        Err(_) => row
            .try_get::<f32, _>(index)
            .map(f64::from)
            .map_err(|e| Error::Read(format!("column {index}: {e}"))),
    }
}

// Decimals arrive as text, a float, or an integer depending on how the
// backing column stores them.
fn decode_decimal(row: &AnyRow, index: usize) -> Result<Decimal> {
    if let Ok(text) = row.try_get::<String, _>(index) {
        return text
            .trim()
            .parse::<Decimal>()
            .map_err(|e| Error::Read(format!("column {index}: invalid decimal `{text}`: {e}")));
    }
    if let Ok(float) = row.try_get::<f64, _>(index) {
        return Decimal::from_f64(float)
            .ok_or_else(|| Error::Read(format!("column {index}: non-finite decimal {float}")));
    }
    let int = get::<i64>(row, index)?;
    Ok(Decimal::from(int))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| Error::Read(format!("invalid date `{text}`: {e}")))
}

fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| Error::Read(format!("invalid timestamp `{text}`: {e}")))
}

fn int_value(value: &TypedValue) -> Result<i64> {
    match value {
        TypedValue::Int8(v) => Ok(i64::from(*v)),
        TypedValue::Int16(v) => Ok(i64::from(*v)),
        TypedValue::Int32(v) => Ok(i64::from(*v)),
        TypedValue::Int64(v) => Ok(*v),
        other => Err(mismatch(other, "integer")),
    }
}

fn float_value(value: &TypedValue) -> Result<f64> {
    match value {
        TypedValue::Float32(v) => Ok(f64::from(*v)),
        TypedValue::Float64(v) => Ok(*v),
        TypedValue::Int8(v) => Ok(f64::from(*v)),
        TypedValue::Int16(v) => Ok(f64::from(*v)),
        TypedValue::Int32(v) => Ok(f64::from(*v)),
        TypedValue::Int64(v) => Ok(*v as f64),
        other => Err(mismatch(other, "float")),
    }
}

fn text_value(value: &TypedValue) -> Result<String> {
    match value {
        TypedValue::Utf8(v) => Ok(v.clone()),
        other => Err(mismatch(other, "string")),
    }
}

fn render_date(value: &TypedValue) -> Result<String> {
    match value {
        TypedValue::Date(v) => Ok(v.format(DATE_FORMAT).to_string()),
        TypedValue::Timestamp(v) => Ok(v.date().format(DATE_FORMAT).to_string()),
        other => Err(mismatch(other, "date")),
    }
}

fn render_timestamp(value: &TypedValue) -> Result<String> {
    match value {
        TypedValue::Timestamp(v) => Ok(v.format(TIMESTAMP_FORMAT).to_string()),
        other => Err(mismatch(other, "timestamp")),
    }
}

fn render_decimal(value: &TypedValue) -> Result<String> {
    match value {
        TypedValue::Decimal(v) => Ok(v.to_string()),
        other => Err(mismatch(other, "decimal")),
    }
}

fn mismatch(value: &TypedValue, expected: &str) -> Error {
    Error::WriteFlush(format!("cannot bind {value:?} into a {expected} column"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clickhouse_names_are_case_sensitive() {
        // ClickHouse Int8 is one byte; Postgres INT8 is eight.
        assert_eq!(native_kind("Int8").unwrap(), NativeKind::Int8);
        assert_eq!(native_kind("INT8").unwrap(), NativeKind::Int64);
        assert_eq!(native_kind("UInt64").unwrap(), NativeKind::Int64);
    }

    #[test]
    fn sql_synonyms_fold_case() {
        assert_eq!(native_kind("varchar").unwrap(), NativeKind::Utf8);
        assert_eq!(native_kind("BIGINT").unwrap(), NativeKind::Int64);
        assert_eq!(native_kind("double precision").unwrap(), NativeKind::Float64);
        assert_eq!(native_kind("datetime").unwrap(), NativeKind::Timestamp);
    }

    #[test]
    fn decimal_names_keep_precision_suffix() {
        assert_eq!(native_kind("Decimal(18, 4)").unwrap(), NativeKind::Decimal);
        assert_eq!(native_kind("NUMERIC(10,2)").unwrap(), NativeKind::Decimal);
    }

    #[test]
    fn unknown_type_is_rejected_by_name() {
        let err = native_kind("GEOMETRY").unwrap_err();
        match err {
            Error::UnsupportedType(name) => assert_eq!(name, "GEOMETRY"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn integer_classification_for_range_filters() {
        assert!(is_integer_type("Int64"));
        assert!(is_integer_type("INT"));
        assert!(!is_integer_type("String"));
        assert!(!is_integer_type("GEOMETRY"));
    }

    #[test]
    fn null_defaults_match_the_documented_policy() {
        assert_eq!(null_default(NativeKind::Int32), TypedValue::Int32(0));
        assert_eq!(null_default(NativeKind::Float64), TypedValue::Float64(0.0));
        assert_eq!(null_default(NativeKind::Utf8), TypedValue::Utf8(String::new()));
        assert_eq!(null_default(NativeKind::Decimal), TypedValue::Decimal(Decimal::ZERO));
        // Temporal defaults are "now"; only their kind is stable.
        assert!(matches!(null_default(NativeKind::Date), TypedValue::Date(_)));
        assert!(matches!(null_default(NativeKind::Timestamp), TypedValue::Timestamp(_)));
    }

    #[test]
    fn date_and_timestamp_round_trip_through_text() {
        let date = NaiveDate::from_ymd_opt(2021, 6, 12).unwrap();
        let rendered = render_date(&TypedValue::Date(date)).unwrap();
        assert_eq!(parse_date(&rendered).unwrap(), date);

        let ts = date.and_hms_micro_opt(23, 11, 22, 123_456).unwrap();
        let rendered = render_timestamp(&TypedValue::Timestamp(ts)).unwrap();
        assert_eq!(parse_timestamp(&rendered).unwrap(), ts);
    }

    #[test]
    fn timestamp_parse_accepts_t_separator() {
        let ts = parse_timestamp("2021-06-12T23:11:22").unwrap();
        assert_eq!(ts.format("%H:%M:%S").to_string(), "23:11:22");
    }

    #[test]
    fn write_conversions_follow_the_target_type() {
        assert_eq!(int_value(&TypedValue::Int8(7)).unwrap(), 7);
        assert_eq!(float_value(&TypedValue::Int32(2)).unwrap(), 2.0);
        assert_eq!(
            render_decimal(&TypedValue::Decimal("12.34".parse().unwrap())).unwrap(),
            "12.34"
        );
        assert!(int_value(&TypedValue::Utf8("x".to_string())).is_err());
        assert!(text_value(&TypedValue::Int64(1)).is_err());
    }
}
