//! Core database infrastructure
//!
//! This module provides the building blocks every store operation is made of:
//! - `DatabaseConn`: SQLite connection wrapper with configuration
//! - `SchemaManager`: live schema inspection and additive migration
//! - `index`: deterministic unique indexes backing upserts
//! - `value`: tagged values and their coercion to and from storage
//! - `record`: ordered records

mod connection;
pub mod index;
mod record;
mod schema;
mod value;

pub use connection::{ConnectionSettings, DatabaseConn, JOURNAL_MODES};
pub use index::{ensure_unique_index, unique_index_name};
pub use record::{Record, Records};
pub use schema::{quote_ident, ColumnInfo, SchemaManager, TableChange};
pub use value::{
    from_storage, to_storage, ColumnType, TypeTag, Value, DATETIME_FORMAT, DATE_FORMAT,
};
