//! Database module
//!
//! This module provides the whole persistence layer, organized into:
//!
//! - **core**: building blocks (connection, schema, unique indexes, values, records)
//! - **store**: the [`Store`] handle and its write path
//! - **variables**: named scalars in the reserved variables table
//! - **query**: raw parameterized queries
//! - **transaction**: scoped transactions
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/            # Foundation
//! │   ├── connection   # SQLite DatabaseConn wrapper
//! │   ├── schema       # live schema reads, table creation, additive migration
//! │   ├── index        # deterministic unique indexes
//! │   ├── value        # tagged values and coercion
//! │   └── record       # ordered records
//! │
//! ├── store            # Store handle, save
//! ├── variables        # save_var / get_var
//! ├── query            # execute / select
//! └── transaction      # Transaction guard, with_transaction
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use scraperwiki::database::{Record, Store};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = Store::open_path("scraperwiki.sqlite");
//!
//! // Tables and columns are created on demand
//! store.save(&["id"], Record::new().with("id", 1).with("name", "first"), None)?;
//!
//! // Same key: the row is updated rather than duplicated
//! store.save(&["id"], Record::new().with("id", 1).with("name", "again"), None)?;
//!
//! let rows = store.select("* FROM swdata")?;
//! assert_eq!(rows.len(), 1);
//!
//! store.save_var("last_page", 12)?;
//! let last_page = store.get_var("last_page")?;
//! # Ok(())
//! # }
//! ```

pub mod core;
mod query;
mod store;
mod transaction;
mod variables;

pub use core::{
    from_storage, to_storage, ColumnInfo, ColumnType, ConnectionSettings, DatabaseConn, Record,
    Records, JOURNAL_MODES, SchemaManager, TableChange, TypeTag, Value,
};
pub use query::{QueryParams, QueryResult};
pub use store::Store;
pub use transaction::Transaction;
pub use variables::VARIABLES_TABLE;
