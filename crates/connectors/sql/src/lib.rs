//! SQL connector crate
//!
//! Parallel table reads and batched writes against relational databases
//! for the Floe Query Engine.
//!
//! The engine binds a table once ([`SqlTable`]), asks it for splits, and
//! hands each split to a worker:
//!
//! ```text
//! SqlTable::plan_splits
//!   ↓ (scheduler distributes SplitDescriptors)
//! SqlTable::open_reader per split
//!   ↓
//! RecordStream of TypedRows
//! ```
//!
//! Writes go the other way through [`BatchWriter`]. Database-specific SQL
//! quirks are confined to [`Dialect`]; value conversions to and from the
//! native column types live in [`codec`].

pub mod codec;
pub mod dialect;
pub mod options;
pub mod pool;
pub mod reader;
pub mod split;
pub mod table;
pub mod writer;

pub use dialect::Dialect;
pub use options::{FlushMode, NullMode, TableOptions};
pub use pool::ConnectionSource;
pub use reader::RecordStream;
pub use split::SplitDescriptor;
pub use table::SqlTable;
pub use writer::BatchWriter;

pub use floe_common::{Error, Result, TypedRow, TypedValue};
