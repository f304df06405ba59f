use anyhow::Result;
use scraperwiki::{OutputFormat, QueryResult, Store, Value};

use super::print_result;

pub fn run(store: &Store, output_format: OutputFormat) -> Result<()> {
    let tables = store.show_tables()?;
    let result = QueryResult {
        keys: vec!["name".to_string(), "sql".to_string()],
        data: tables
            .into_iter()
            .map(|(name, sql)| vec![Value::Text(name), Value::Text(sql)])
            .collect(),
    };
    print_result(&result, output_format)
}
