use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::schema::SchemaRef;

/// A single column value in one of the supported data kinds.
///
/// This is a closed set: connectors refuse column types they cannot map
/// onto one of these variants instead of passing raw values through.
/// `Null` is an explicit marker so callers never confuse a database NULL
/// with a zero value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Utf8(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Decimal(Decimal),
    Null,
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }
}

/// One fetched row: an ordered mapping from column name to typed value.
///
/// Rows share the schema of the binding that produced them, so per-row
/// overhead is one `Arc` clone plus the values themselves.
#[derive(Debug, Clone)]
pub struct TypedRow {
    schema: SchemaRef,
    values: Vec<TypedValue>,
}

impl TypedRow {
    pub fn new(schema: SchemaRef, values: Vec<TypedValue>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the column called `name`, if the row has such a column.
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    pub fn values(&self) -> &[TypedValue] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.schema.names().zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<TypedValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::{ColumnDescriptor, ColumnSchema};

    fn schema() -> SchemaRef {
        Arc::new(ColumnSchema::new(vec![
            ColumnDescriptor { name: "id".to_string(), native_type: "Int32".to_string() },
            ColumnDescriptor { name: "name".to_string(), native_type: "String".to_string() },
        ]))
    }

    #[test]
    fn get_by_name_follows_schema_order() {
        let row = TypedRow::new(
            schema(),
            vec![TypedValue::Int32(7), TypedValue::Utf8("seven".to_string())],
        );
        assert_eq!(row.get("id"), Some(&TypedValue::Int32(7)));
        assert_eq!(row.get("name"), Some(&TypedValue::Utf8("seven".to_string())));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn null_marker_is_distinguishable_from_zero() {
        let row = TypedRow::new(schema(), vec![TypedValue::Int32(0), TypedValue::Null]);
        assert!(!row.get("id").unwrap().is_null());
        assert!(row.get("name").unwrap().is_null());
    }

    #[test]
    fn iter_pairs_names_with_values() {
        let row = TypedRow::new(
            schema(),
            vec![TypedValue::Int32(1), TypedValue::Utf8("one".to_string())],
        );
        let pairs: Vec<_> = row.iter().map(|(n, v)| (n.to_string(), v.clone())).collect();
        assert_eq!(pairs[0].0, "id");
        assert_eq!(pairs[1].1, TypedValue::Utf8("one".to_string()));
    }
}
