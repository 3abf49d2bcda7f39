use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Column, Executor, TypeInfo};
use tracing::debug;

use floe_common::{ColumnDescriptor, ColumnSchema, Error, Result, SchemaRef};

use crate::dialect::Dialect;
use crate::options::TableOptions;

/// Shared handle to the pooled connections of one table binding.
///
/// The pool supports concurrent checkout from multiple workers; cloning
/// the handle is cheap and reference-counted. Creation is driven by the
/// owning [`SqlTable`](crate::table::SqlTable), which guarantees a single
/// instance per binding.
#[derive(Debug, Clone)]
pub struct ConnectionSource {
    pool: AnyPool,
}

impl ConnectionSource {
    /// Open the pool for `options`. Fails with [`Error::Connection`] when
    /// the URL is invalid or the initial connection cannot be made.
    pub async fn connect(options: &TableOptions) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .min_connections(1)
            .max_connections(options.pool_max_connections)
            .acquire_timeout(Duration::from_millis(options.pool_acquire_timeout_ms))
            .connect(&options.url)
            .await
            .map_err(|e| Error::Connection(format!("failed to open pool for `{}`: {e}", options.url)))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Live connections, checked in or out.
    pub fn size(&self) -> u32 {
        self.pool.size()
    }

    /// Connections currently idle in the pool.
    pub fn num_idle(&self) -> usize {
        self.pool.num_idle()
    }

    /// Close every pooled connection. Called when the owning table
    /// binding is discarded.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run the one-row metadata probe for `base_query` and collect column
    /// names and native type names in projection order.
    pub async fn probe_schema(&self, dialect: Dialect, base_query: &str) -> Result<SchemaRef> {
        let probe = dialect.limit(base_query, 1);
        debug!(query = %probe, "executing schema probe");

        let described = self
            .pool
            .describe(&probe)
            .await
            .map_err(|e| Error::Schema(format!("probe query failed: {e}")))?;

        let columns: Vec<ColumnDescriptor> = described
            .columns()
            .iter()
            .map(|column| ColumnDescriptor {
                name: column.name().to_string(),
                native_type: column.type_info().name().to_string(),
            })
            .collect();

        if columns.is_empty() {
            return Err(Error::Schema("probe query returned zero columns".to_string()));
        }
        Ok(SchemaRef::new(ColumnSchema::new(columns)))
    }
}
