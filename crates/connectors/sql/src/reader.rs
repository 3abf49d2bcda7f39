use futures::TryStreamExt;
use sqlx::AnyPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use floe_common::{Error, Result, SchemaRef, TypedRow};

use crate::codec;
use crate::dialect::Dialect;
use crate::pool::ConnectionSource;
use crate::split::SplitDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Open,
    Exhausted,
    Closed,
    Failed,
}

/// Streams the rows of one split as typed rows.
///
/// A single producer task owns the checked-out connection, the executing
/// statement and its cursor; the three share one lifetime and are
/// released together when the task ends, whether through exhaustion, a
/// mid-stream failure, or `close()`. Rows are decoded on the producer
/// side and handed over through a bounded channel whose capacity is the
/// configured fetch size, which keeps memory bounded while millions of
/// rows stream through.
pub struct RecordStream {
    schema: SchemaRef,
    rows: mpsc::Receiver<Result<TypedRow>>,
    producer: JoinHandle<()>,
    state: StreamState,
}

impl RecordStream {
    pub(crate) fn open(
        source: &ConnectionSource,
        dialect: Dialect,
        schema: SchemaRef,
        base_query: &str,
        split: &SplitDescriptor,
        fetch_size: usize,
    ) -> RecordStream {
        let sql = match split {
            SplitDescriptor::Offset { limit, offset } => {
                dialect.limit_offset(base_query, *limit, *offset)
            }
            SplitDescriptor::Range { column, column_type, lower, upper, .. } => dialect
                .range_filter(
                    base_query,
                    column_type,
                    column,
                    &lower.to_string(),
                    &upper.to_string(),
                ),
        };
        debug!(query = %sql, "opening record stream");

        let (tx, rx) = mpsc::channel(fetch_size.max(1));
        let pool = source.pool().clone();
        let producer_schema = schema.clone();
        let producer = tokio::spawn(async move {
            if let Err(err) = pump_rows(pool, sql, producer_schema, &tx).await {
                // The consumer may already be gone; nothing more to do then.
                let _ = tx.send(Err(err)).await;
            }
        });

        RecordStream { schema, rows: rx, producer, state: StreamState::Open }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// The next row of the split, or `None` once it is exhausted.
    ///
    /// A `Some(Err(_))` is terminal: the stream moves to the failed state
    /// and its resources are released before the error is returned.
    pub async fn next(&mut self) -> Option<Result<TypedRow>> {
        if self.state != StreamState::Open {
            return None;
        }
        match self.rows.recv().await {
            Some(Ok(row)) => Some(Ok(row)),
            Some(Err(err)) => {
                self.state = StreamState::Failed;
                self.release();
                Some(Err(err))
            }
            None => {
                self.state = StreamState::Exhausted;
                self.release();
                None
            }
        }
    }

    /// Release the stream's resources. Idempotent and safe to call after
    /// exhaustion or failure.
    pub fn close(&mut self) {
        if self.state == StreamState::Open {
            self.state = StreamState::Closed;
        }
        self.release();
    }

    fn release(&mut self) {
        // Aborting the producer drops its connection, statement and
        // cursor in one step; a finished task is a no-op to abort.
        self.producer.abort();
        self.rows.close();
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        self.close();
    }
}

async fn pump_rows(
    pool: AnyPool,
    sql: String,
    schema: SchemaRef,
    tx: &mpsc::Sender<Result<TypedRow>>,
) -> Result<()> {
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| Error::Read(format!("failed to check out a connection: {e}")))?;

    let mut rows = sqlx::query(&sql).fetch(&mut *conn);
    while let Some(row) = rows
        .try_next()
        .await
        .map_err(|e| Error::Read(format!("cursor failure: {e}")))?
    {
        let mut values = Vec::with_capacity(schema.len());
        for (index, column) in schema.columns().iter().enumerate() {
            values.push(codec::decode_value(&row, index, &column.native_type)?);
        }
        if tx.send(Ok(TypedRow::new(schema.clone(), values))).await.is_err() {
            // Consumer closed early; stop fetching and give the
            // connection back.
            break;
        }
    }
    Ok(())
}
