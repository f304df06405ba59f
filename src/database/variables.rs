//! Named variables
//!
//! Scalars are kept in the reserved `swvariables` table, one row per name:
//! `name`, `value_blob` holding the stored representation and `type` holding the
//! tag of the original kind. Text-like values are stored as UTF-8 bytes.

use anyhow::Result;
use rusqlite::types::Value as SqlValue;
use rusqlite::OptionalExtension;

use super::core::{
    from_storage, quote_ident, to_storage, Record, SchemaManager, TableChange, TypeTag,
    Value,
};
use super::store::Store;

/// Reserved table holding named variables
pub const VARIABLES_TABLE: &str = "swvariables";

impl Store {
    /// Store `value` under `name`, replacing any previous value
    pub fn save_var(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (stored, tag) = to_storage(&value);
        let stored = match stored {
            SqlValue::Text(s) if tag.is_textual() => SqlValue::Blob(s.into_bytes()),
            other => other,
        };

        let tx = self.transaction()?;
        self.ensure_variables_table()?;
        let record = Record::new()
            .with("name", name)
            .with("value_blob", Value::from(stored))
            .with("type", tag.as_str());
        self.save(&["name"], record, Some(VARIABLES_TABLE))?;
        tx.commit()
    }

    /// Value stored under `name`, or `None` when there is none
    ///
    /// Booleans come back as integers 0/1, dates and datetimes as text.
    pub fn get_var(&self, name: &str) -> Result<Option<Value>> {
        let db = self.db()?;
        if !SchemaManager::new(&db.conn).table_exists(VARIABLES_TABLE)? {
            return Ok(None);
        }

        let sql = format!(
            "SELECT value_blob, type FROM {} WHERE name = ?1",
            quote_ident(VARIABLES_TABLE)
        );
        let found: Option<(SqlValue, Option<String>)> = db
            .conn
            .query_row(&sql, [name], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        Ok(found.map(|(stored, tag)| {
            match tag.as_deref().map(str::parse::<TypeTag>) {
                Some(Ok(tag)) => from_storage(stored, tag),
                _ => Value::from(stored),
            }
        }))
    }

    /// Like [`Store::get_var`], falling back to `default`
    pub fn get_var_or(&self, name: &str, default: impl Into<Value>) -> Result<Value> {
        Ok(self.get_var(name)?.unwrap_or_else(|| default.into()))
    }

    /// Create the variables table with a blob value column before the first save
    fn ensure_variables_table(&self) -> Result<()> {
        let template = Record::new()
            .with("name", "")
            .with("value_blob", Vec::<u8>::new())
            .with("type", "");
        let change = SchemaManager::new(&self.db()?.conn).ensure_table(VARIABLES_TABLE, &template)?;
        if change == TableChange::Created {
            self.forget_indexes(VARIABLES_TABLE);
        }
        Ok(())
    }
}
