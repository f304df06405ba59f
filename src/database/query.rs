//! Raw query execution
//!
//! Query text is run verbatim with positional parameters. Results keep the
//! column order reported by SQLite.

use anyhow::Result;
use rusqlite::params_from_iter;
use serde::Serialize;
use tracing::debug;

use super::core::{quote_ident, to_storage, Record, SchemaManager, Value};
use super::store::Store;

/// Result of [`Store::execute`]: column names and row tuples
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub keys: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Rows as records keyed by column name
    pub fn into_records(self) -> Vec<Record> {
        let QueryResult { keys, data } = self;
        data.into_iter()
            .map(|row| keys.iter().cloned().zip(row).collect())
            .collect()
    }
}

/// Positional parameters for a query; a single scalar becomes a one-element list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(pub Vec<Value>);

impl From<()> for QueryParams {
    fn from(_: ()) -> Self {
        QueryParams::default()
    }
}

impl From<Value> for QueryParams {
    fn from(value: Value) -> Self {
        QueryParams(vec![value])
    }
}

impl From<Vec<Value>> for QueryParams {
    fn from(values: Vec<Value>) -> Self {
        QueryParams(values)
    }
}

impl From<&[Value]> for QueryParams {
    fn from(values: &[Value]) -> Self {
        QueryParams(values.to_vec())
    }
}

impl From<Option<Vec<Value>>> for QueryParams {
    fn from(values: Option<Vec<Value>>) -> Self {
        QueryParams(values.unwrap_or_default())
    }
}

impl From<&str> for QueryParams {
    fn from(value: &str) -> Self {
        QueryParams(vec![Value::from(value)])
    }
}

impl From<String> for QueryParams {
    fn from(value: String) -> Self {
        QueryParams(vec![Value::Text(value)])
    }
}

impl From<i64> for QueryParams {
    fn from(value: i64) -> Self {
        QueryParams(vec![Value::Integer(value)])
    }
}

impl From<f64> for QueryParams {
    fn from(value: f64) -> Self {
        QueryParams(vec![Value::Real(value)])
    }
}

impl From<bool> for QueryParams {
    fn from(value: bool) -> Self {
        QueryParams(vec![Value::Boolean(value)])
    }
}

impl Store {
    /// Run `sql` verbatim with positional parameters
    ///
    /// Statements that produce no columns return an empty result. Engine
    /// errors are returned as they are.
    pub fn execute(&self, sql: &str, params: impl Into<QueryParams>) -> Result<QueryResult> {
        let QueryParams(params) = params.into();
        let db = self.db()?;
        debug!("{}", sql);

        let mut stmt = db.conn.prepare(sql)?;
        let keys: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let values = params.iter().map(|v| to_storage(v).0);

        let mut rows = stmt.query(params_from_iter(values))?;
        let mut data = Vec::new();
        while let Some(row) = rows.next()? {
            let mut tuple = Vec::with_capacity(keys.len());
            for i in 0..keys.len() {
                let value: rusqlite::types::Value = row.get_ref(i)?.into();
                tuple.push(Value::from(value));
            }
            data.push(tuple);
        }

        Ok(QueryResult { keys, data })
    }

    /// `SELECT` + `query_suffix`, rows returned as records
    pub fn select(&self, query_suffix: &str) -> Result<Vec<Record>> {
        let sql = format!("SELECT {}", query_suffix);
        Ok(self.execute(&sql, ())?.into_records())
    }

    /// All tables in the store with their creation SQL
    pub fn show_tables(&self) -> Result<Vec<(String, String)>> {
        SchemaManager::new(&self.db()?.conn).list_tables()
    }

    /// `PRAGMA table_info` for a table
    pub fn table_info(&self, table: &str) -> Result<QueryResult> {
        self.execute(&format!("PRAGMA table_info({})", quote_ident(table)), ())
    }
}
