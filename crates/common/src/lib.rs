//! Common crate
//!
//! Shared types and error handling for Floe connectors.
//!
//! # Example
//! ```rust
//! use floe_common::TypedValue;
//! let v = TypedValue::Int64(42);
//! assert!(!v.is_null());
//! ```

pub mod error;
pub mod schema;
pub mod value;

pub use error::{Error, Result};
pub use schema::{ColumnDescriptor, ColumnSchema, SchemaRef};
pub use value::{TypedRow, TypedValue};
