#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! scraperwiki - a local datastore for scrapers
//!
//! Scraped rows are saved into a single SQLite file. Tables and columns are
//! created on demand from the data being saved, unique keys turn saves into
//! upserts, and small named values survive between runs as variables. Raw SQL
//! stays available for everything else.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Store, records, variables, raw SQL | `rusqlite`, `config` |
//! | `utils` | `scrape`, `pdftoxml`, `status` helpers | `ureq`, `tempfile` |
//! | `display` | Table rendering of query results | `tabled` |
//! | `cli` | The `scraperwiki` binary | All above + `clap` |
//!
//! ## Choosing Features
//!
//! ```toml
//! # Store only
//! scraperwiki = { version = "0.6", default-features = false }
//!
//! # Store plus fetch/PDF helpers
//! scraperwiki = { version = "0.6", default-features = false, features = ["utils"] }
//!
//! # Default (CLI binary)
//! scraperwiki = "0.6"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: the store (always available)
//!   - `core`: connection, values, records, schema evolution, unique indexes
//!   - saving, transactions, raw queries and variables on [`Store`]
//! - **[`config`]**: store location and connection settings
//! - **`utils`**: fetch and PDF helpers (requires `utils`)
//! - **`output`**: output formats for query results (requires `display`)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scraperwiki::{Record, ScraperwikiConfig, Store};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ScraperwikiConfig::new(&None)?;
//! let store = Store::new(&config);
//!
//! // upsert keyed on `id`, into the default table `swdata`
//! store.save(&["id"], Record::new().with("id", 1).with("name", "first"), None)?;
//!
//! // variables persist between runs
//! let runs = store.get_var_or("runs", 0)?.as_i64().unwrap_or(0);
//! store.save_var("runs", runs + 1)?;
//!
//! for row in store.select("* FROM swdata")? {
//!     println!("{:?}", row.get("name"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;

#[cfg(feature = "utils")]
pub mod utils;

#[cfg(feature = "display")]
pub mod output;

// =============================================================================
// Configuration (always available)
// =============================================================================

pub use config::{ScraperwikiConfig, DEFAULT_DATABASE_PATH, DEFAULT_TABLE};

// =============================================================================
// Database Module - Re-export commonly used types (always available)
// =============================================================================

pub use database::{
    ColumnType, DatabaseConn, QueryParams, QueryResult, Record, Records, Store, Transaction,
    TypeTag, Value, VARIABLES_TABLE,
};

// =============================================================================
// Feature-gated exports
// =============================================================================

#[cfg(feature = "utils")]
pub use utils::{pdftoxml, scrape, status};

#[cfg(feature = "display")]
pub use output::OutputFormat;
