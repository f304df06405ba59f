//! Unique index management
//!
//! A unique key set turns writes to a table into upserts. The index backing it
//! is named deterministically from the table and key names, so repeated saves
//! with the same keys always land on the same index.

use anyhow::{bail, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use super::schema::quote_ident;

fn alphanumeric(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Index name for a table and key set: `<table>_<key>..._unique`
///
/// Each component keeps only its ASCII alphanumeric characters.
pub fn unique_index_name(table: &str, keys: &[&str]) -> String {
    let mut parts = Vec::with_capacity(keys.len() + 2);
    parts.push(alphanumeric(table));
    parts.extend(keys.iter().map(|k| alphanumeric(k)));
    parts.push("unique".to_string());
    parts.join("_")
}

/// Table an index of this name belongs to, if the index exists
pub fn index_table(conn: &Connection, index_name: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT tbl_name FROM sqlite_master WHERE type='index' AND name=?1",
            [index_name],
            |row| row.get(0),
        )
        .optional()?)
}

/// Create the unique index for `keys` on `table` unless it is already present
///
/// Returns `true` when the index was created by this call. An empty key set is
/// a no-op. Index names are shared across the whole database, so a name
/// already taken by an index on another table is an error.
pub fn ensure_unique_index(conn: &Connection, table: &str, keys: &[&str]) -> Result<bool> {
    if keys.is_empty() {
        return Ok(false);
    }

    let name = unique_index_name(table, keys);
    match index_table(conn, &name)? {
        Some(owner) if owner.eq_ignore_ascii_case(table) => return Ok(false),
        Some(owner) => bail!(
            "Unique index '{}' for table '{}' is already used by table '{}'",
            name,
            table,
            owner
        ),
        None => {}
    }

    let columns = keys
        .iter()
        .map(|k| quote_ident(k))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "CREATE UNIQUE INDEX {} ON {} ({})",
        quote_ident(&name),
        quote_ident(table),
        columns
    );
    debug!("{}", sql);
    conn.execute(&sql, [])?;
    Ok(true)
}
