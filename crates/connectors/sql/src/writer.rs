use sqlx::AnyPool;
use tracing::{error, info, warn};

use floe_common::{Error, Result, SchemaRef, TypedRow, TypedValue};

use crate::codec;
use crate::dialect::Dialect;
use crate::options::{FlushMode, NullMode, TableOptions};
use crate::pool::ConnectionSource;

/// Buffers typed rows and flushes them as parameterized inserts.
///
/// The insert statement is built once and reused for every flush. A flush
/// binds the whole buffer inside one transaction and retries the entire
/// batch on failure, without backoff; the buffer is cleared afterwards
/// whether or not the flush succeeded, so a batch is never retried across
/// flush calls.
pub struct BatchWriter {
    pool: AnyPool,
    schema: SchemaRef,
    insert_sql: String,
    batch_size: usize,
    write_retries: u32,
    null_mode: NullMode,
    flush_mode: FlushMode,
    buffer: Vec<TypedRow>,
    total_flushed: u64,
    flush_count: u64,
}

impl BatchWriter {
    pub(crate) fn new(
        source: &ConnectionSource,
        dialect: Dialect,
        schema: SchemaRef,
        table: &str,
        options: &TableOptions,
    ) -> Self {
        let insert_sql = build_insert_statement(dialect, table, &schema);
        Self {
            pool: source.pool().clone(),
            schema,
            insert_sql,
            batch_size: options.batch_size,
            write_retries: options.write_retries,
            null_mode: options.null_mode,
            flush_mode: options.flush_mode,
            buffer: Vec::new(),
            total_flushed: 0,
            flush_count: 0,
        }
    }

    /// Append a row; reaching the batch threshold triggers a flush.
    pub async fn write(&mut self, row: TypedRow) -> Result<()> {
        self.buffer.push(row);
        if self.buffer.len() >= self.batch_size {
            if let Err(err) = self.flush().await {
                match self.flush_mode {
                    FlushMode::Propagate => return Err(err),
                    FlushMode::Drop => {
                        error!(%err, "dropping batch after exhausted retries");
                    }
                }
            }
        }
        Ok(())
    }

    /// Flush the buffered rows, retrying the whole batch on failure.
    ///
    /// The buffer is cleared unconditionally; exhausted retries surface as
    /// [`Error::WriteFlush`] with the rows already gone.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.flush_once().await {
                Ok(()) => break Ok(()),
                Err(err) if attempts < self.write_retries => {
                    warn!(%err, attempt = attempts, "flush attempt failed, retrying");
                }
                Err(err) => {
                    break Err(Error::WriteFlush(format!(
                        "flush failed after {attempts} attempts: {err}"
                    )));
                }
            }
        };

        if result.is_ok() {
            self.total_flushed += self.buffer.len() as u64;
            self.flush_count += 1;
            info!(
                rows = self.buffer.len(),
                total = self.total_flushed,
                "flushed batch"
            );
        }
        self.buffer.clear();
        result
    }

    async fn flush_once(&self) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::WriteFlush(format!("failed to begin transaction: {e}")))?;

        for row in &self.buffer {
            let mut query = sqlx::query(&self.insert_sql);
            for column in self.schema.columns() {
                // A row missing one of the target columns writes a null.
                let value = row.get(&column.name).unwrap_or(&TypedValue::Null);
                query = codec::bind_value(query, &column.native_type, value, self.null_mode)?;
            }
            query
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::WriteFlush(format!("insert failed: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| Error::WriteFlush(format!("commit failed: {e}")))
    }

    /// Flush whatever is still buffered.
    pub async fn close(&mut self) -> Result<()> {
        info!(remaining = self.buffer.len(), "closing writer");
        self.flush().await
    }

    /// Rows successfully written over the writer's lifetime.
    pub fn total_flushed(&self) -> u64 {
        self.total_flushed
    }

    /// Number of successful flushes, automatic and explicit.
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Rows currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

fn build_insert_statement(dialect: Dialect, table: &str, schema: &SchemaRef) -> String {
    let columns = schema.names().collect::<Vec<_>>().join(", ");
    let placeholders = (1..=schema.len())
        .map(|position| dialect.placeholder(position))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use floe_common::{ColumnDescriptor, ColumnSchema};

    use super::*;

    #[test]
    fn insert_statement_lists_columns_in_schema_order() {
        let schema = Arc::new(ColumnSchema::new(vec![
            ColumnDescriptor { name: "id".to_string(), native_type: "Int64".to_string() },
            ColumnDescriptor { name: "name".to_string(), native_type: "String".to_string() },
        ]));
        assert_eq!(
            build_insert_statement(Dialect::MySql, "events", &schema),
            "INSERT INTO events (id, name) VALUES (?, ?)"
        );
        assert_eq!(
            build_insert_statement(Dialect::Postgres, "events", &schema),
            "INSERT INTO events (id, name) VALUES ($1, $2)"
        );
    }
}
