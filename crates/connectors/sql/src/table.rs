use sqlx::Row;
use tokio::sync::OnceCell;
use tracing::debug;

use floe_common::{Error, Result, SchemaRef};

use crate::codec;
use crate::dialect::Dialect;
use crate::options::TableOptions;
use crate::pool::ConnectionSource;
use crate::reader::RecordStream;
use crate::split::{self, SplitDescriptor};
use crate::writer::BatchWriter;

/// One bound table: the facade the host engine talks to.
///
/// The scheduler calls [`plan_splits`](SqlTable::plan_splits) once, then
/// each worker opens a reader for its split; writes go through
/// [`open_writer`](SqlTable::open_writer). The connection pool and the
/// probed schema are created lazily, at most once, and shared by every
/// reader and writer of the binding.
pub struct SqlTable {
    options: TableOptions,
    base_query: String,
    source: OnceCell<ConnectionSource>,
    schema: OnceCell<SchemaRef>,
}

impl SqlTable {
    pub fn new(options: TableOptions) -> Result<Self> {
        options.validate()?;
        let base_query = options.base_query();
        Ok(Self { options, base_query, source: OnceCell::new(), schema: OnceCell::new() })
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn dialect(&self) -> Dialect {
        self.options.database_type
    }

    /// The shared connection source, created on first use. Concurrent
    /// first callers converge on a single pool.
    pub async fn source(&self) -> Result<&ConnectionSource> {
        self.source
            .get_or_try_init(|| ConnectionSource::connect(&self.options))
            .await
    }

    /// Column names and native types of the base query, probed once.
    pub async fn schema(&self) -> Result<SchemaRef> {
        let schema = self
            .schema
            .get_or_try_init(|| async {
                let source = self.source().await?;
                source.probe_schema(self.dialect(), &self.base_query).await
            })
            .await?;
        Ok(schema.clone())
    }

    /// Partition the table into independent, non-overlapping scan units.
    pub async fn plan_splits(&self) -> Result<Vec<SplitDescriptor>> {
        match self.options.split_column.clone() {
            Some(column) => self.plan_range_splits(&column).await,
            None => self.plan_offset_splits().await,
        }
    }

    async fn plan_offset_splits(&self) -> Result<Vec<SplitDescriptor>> {
        let requested = self.options.split_count as i64;
        // A single requested split reads everything; skip the count
        // round-trip and ask for an unbounded window.
        let total = if requested <= 1 { i64::MAX } else { self.total_row_count().await? };
        Ok(split::offset_splits(total, requested))
    }

    async fn total_row_count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM ({}) tmptable", self.base_query);
        debug!(query = %sql, "executing count query");
        let source = self.source().await?;
        let row = sqlx::query(&sql)
            .fetch_optional(source.pool())
            .await
            .map_err(|e| Error::Count(format!("count query failed: {e}")))?
            .ok_or_else(|| Error::Count("count query did not return any results".to_string()))?;
        row.try_get::<i64, _>(0)
            .map_err(|e| Error::Count(format!("count column: {e}")))
    }

    async fn plan_range_splits(&self, column: &str) -> Result<Vec<SplitDescriptor>> {
        let schema = self.schema().await?;
        let column_type = schema
            .native_type(column)
            .ok_or_else(|| {
                Error::RangeQuery(format!("split column `{column}` is not part of the projection"))
            })?
            .to_string();
        let kind = codec::native_kind(&column_type)?;
        if !kind.is_integer() {
            return Err(Error::RangeQuery(format!(
                "range splitting requires an integer column, `{column}` has type {column_type}"
            )));
        }

        let sql = format!(
            "SELECT MIN({column}) AS min_split_value, MAX({column}) AS max_split_value FROM ({}) tmptable",
            self.base_query
        );
        debug!(query = %sql, "executing split bounds query");
        let source = self.source().await?;
        let row = sqlx::query(&sql)
            .fetch_optional(source.pool())
            .await
            .map_err(|e| Error::RangeQuery(format!("split bounds query failed: {e}")))?
            .ok_or_else(|| {
                Error::RangeQuery("split bounds query did not return any results".to_string())
            })?;

        let min: Option<i64> = row
            .try_get(0)
            .map_err(|e| Error::RangeQuery(format!("min bound: {e}")))?;
        let max: Option<i64> = row
            .try_get(1)
            .map_err(|e| Error::RangeQuery(format!("max bound: {e}")))?;

        match (min, max) {
            (Some(min), Some(max)) => {
                Ok(split::range_splits(column, &column_type, min, max, split::RANGE_SPLIT_COUNT))
            }
            // Empty table: one window that covers nothing.
            _ => Ok(vec![SplitDescriptor::Offset { limit: 0, offset: 0 }]),
        }
    }

    /// Open a streaming reader for one split.
    pub async fn open_reader(&self, split: &SplitDescriptor) -> Result<RecordStream> {
        let schema = self.schema().await?;
        let source = self.source().await?;
        Ok(RecordStream::open(
            source,
            self.dialect(),
            schema,
            &self.base_query,
            split,
            self.options.fetch_size,
        ))
    }

    /// Open a batch writer targeting the bound table.
    pub async fn open_writer(&self) -> Result<BatchWriter> {
        let table = self
            .options
            .table
            .clone()
            .ok_or_else(|| Error::InvalidOptions("writes require a `table` binding".to_string()))?;
        let schema = self.schema().await?;
        let source = self.source().await?;
        Ok(BatchWriter::new(source, self.dialect(), schema, &table, &self.options))
    }

    /// Tear down the shared pool. Readers and writers already opened keep
    /// their checked-out connections until they finish.
    pub async fn close(&self) {
        if let Some(source) = self.source.get() {
            source.close().await;
        }
    }
}
