use std::sync::Arc;

/// One column of a probed result set: the column name plus the native type
/// name reported by the driver (e.g. `INTEGER`, `VARCHAR`, `Int64`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub native_type: String,
}

/// Ordered column metadata for one table binding.
///
/// Populated once from the metadata probe query and immutable afterwards.
/// The column order matches the projection order of the base query.
#[derive(Debug, Clone, Default)]
pub struct ColumnSchema {
    columns: Vec<ColumnDescriptor>,
}

pub type SchemaRef = Arc<ColumnSchema>;

impl ColumnSchema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Position of `name` in the projection, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Native type name of the column called `name`, if present.
    pub fn native_type(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.native_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ColumnSchema {
        ColumnSchema::new(vec![
            ColumnDescriptor { name: "id".to_string(), native_type: "Int64".to_string() },
            ColumnDescriptor { name: "name".to_string(), native_type: "String".to_string() },
        ])
    }

    #[test]
    fn lookup_preserves_projection_order() {
        let schema = sample();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(schema.native_type("id"), Some("Int64"));
    }

    #[test]
    fn unknown_column_is_none() {
        let schema = sample();
        assert_eq!(schema.index_of("missing"), None);
        assert_eq!(schema.native_type("missing"), None);
    }
}
