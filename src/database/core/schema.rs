//! Database schema management
//!
//! Tables are never declared up front. [`SchemaManager::ensure_table`] reads the
//! live column list of a table, creates the table when it is missing and adds
//! any missing columns when it is not. Nothing here is cached: a table created
//! by another connection or an earlier process is always seen as it is on disk.

use anyhow::{bail, Result};
use rusqlite::Connection;
use tracing::debug;

use super::record::Record;
use super::value::ColumnType;

/// Quote an identifier for use in generated SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A column as reported by `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    /// Declared type, empty for columns added without one
    pub declared_type: String,
}

/// Outcome of [`SchemaManager::ensure_table`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableChange {
    /// The table did not exist and was created
    Created,
    /// The table existed and these columns were added
    Altered(Vec<String>),
    /// The table already had every column
    Unchanged,
}

/// Schema manager for auto-created tables
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Columns of a table in declaration order, empty if the table does not exist
    pub fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    cid: row.get(0)?,
                    name: row.get(1)?,
                    declared_type: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All tables with their creation SQL, in name order
    pub fn list_tables(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, sql FROM sqlite_master WHERE type='table' ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get::<_, Option<String>>(1)?.unwrap_or_default()))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tables)
    }

    /// Make sure `table` exists and has a column for every field of `record`
    ///
    /// A missing table is created with column types inferred from the record's
    /// values. Columns missing from an existing table are added without a
    /// declared type so later rows of any kind are stored as bound.
    pub fn ensure_table(&self, table: &str, record: &Record) -> Result<TableChange> {
        let existing = self.table_columns(table)?;

        if existing.is_empty() {
            if record.is_empty() {
                bail!("Cannot create table '{}' without columns", table);
            }
            let columns = record
                .iter()
                .map(|(name, value)| {
                    format!(
                        "{} {}",
                        quote_ident(name),
                        ColumnType::infer(value).declaration()
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("CREATE TABLE {} ({})", quote_ident(table), columns);
            debug!("{}", sql);
            self.conn.execute(&sql, [])?;
            return Ok(TableChange::Created);
        }

        // SQLite compares column names ASCII case-insensitively
        let mut known: Vec<String> = existing
            .iter()
            .map(|c| c.name.to_ascii_lowercase())
            .collect();
        let mut added = Vec::new();
        for name in record.columns() {
            let folded = name.to_ascii_lowercase();
            if known.contains(&folded) {
                continue;
            }
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_ident(table),
                quote_ident(name)
            );
            debug!("{}", sql);
            self.conn.execute(&sql, [])?;
            known.push(folded);
            added.push(name.to_string());
        }

        if added.is_empty() {
            Ok(TableChange::Unchanged)
        } else {
            Ok(TableChange::Altered(added))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::value::Value;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_ident("model-numbers\u{aa}"), "\"model-numbers\u{aa}\"");
    }

    #[test]
    fn test_create_with_inferred_types() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);
        let record = Record::new()
            .with("id", 1)
            .with("flag", true)
            .with("score", 1.5)
            .with("name", "x")
            .with("raw", vec![0u8, 1])
            .with("missing", Value::Null);

        assert_eq!(
            manager.ensure_table("things", &record).unwrap(),
            TableChange::Created
        );

        let columns = manager.table_columns("things").unwrap();
        let described: Vec<(&str, &str)> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.declared_type.as_str()))
            .collect();
        assert_eq!(
            described,
            vec![
                ("id", "INTEGER"),
                ("flag", "BOOLEAN"),
                ("score", "REAL"),
                ("name", "TEXT"),
                ("raw", "BLOB"),
                ("missing", "TEXT"),
            ]
        );
    }

    #[test]
    fn test_add_missing_columns_only() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager
            .ensure_table("t", &Record::new().with("a", 1))
            .unwrap();
        let change = manager
            .ensure_table("t", &Record::new().with("a", 2).with("b", "x"))
            .unwrap();
        assert_eq!(change, TableChange::Altered(vec!["b".to_string()]));

        let change = manager
            .ensure_table("t", &Record::new().with("A", 3).with("b", "y"))
            .unwrap();
        assert_eq!(change, TableChange::Unchanged);

        let columns = manager.table_columns("t").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].declared_type, "");
    }

    #[test]
    fn test_added_column_keeps_value_kind() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager
            .ensure_table("t", &Record::new().with("a", 1))
            .unwrap();
        manager
            .ensure_table("t", &Record::new().with("b", "text"))
            .unwrap();
        conn.execute("INSERT INTO t (a, b) VALUES (1, 42)", []).unwrap();
        let kind: String = conn
            .query_row("SELECT typeof(b) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(kind, "integer");
    }

    #[test]
    fn test_sees_table_created_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.sqlite");

        let other = Connection::open(&path).unwrap();
        let conn = Connection::open(&path).unwrap();
        let manager = SchemaManager::new(&conn);
        assert!(!manager.table_exists("frigled").unwrap());

        other
            .execute("CREATE TABLE frigled (a TEXT)", [])
            .unwrap();

        let change = manager
            .ensure_table("frigled", &Record::new().with("a", "x").with("b", "y"))
            .unwrap();
        assert_eq!(change, TableChange::Altered(vec!["b".to_string()]));
    }

    #[test]
    fn test_create_without_columns_fails() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);
        assert!(manager.ensure_table("empty", &Record::new()).is_err());
        assert!(!manager.table_exists("empty").unwrap());
    }

    #[test]
    fn test_list_tables() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);
        manager
            .ensure_table("b_table", &Record::new().with("x", 1))
            .unwrap();
        manager
            .ensure_table("a_table", &Record::new().with("y", 1))
            .unwrap();

        let tables = manager.list_tables().unwrap();
        let names: Vec<&str> = tables.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a_table", "b_table"]);
        assert!(tables[0].1.starts_with("CREATE TABLE"));
    }
}
