use anyhow::Result;
use clap::Args;
use scraperwiki::{OutputFormat, Store, Value};

use super::print_result;

/// Arguments for the Execute command
#[derive(Args)]
pub struct ExecuteArgs {
    /// SQL statement, run verbatim
    pub sql: String,

    /// Positional parameters bound to `?` placeholders, passed as text
    pub params: Vec<String>,
}

pub fn run(store: &Store, args: ExecuteArgs, output_format: OutputFormat) -> Result<()> {
    let ExecuteArgs { sql, params } = args;
    let params: Vec<Value> = params.into_iter().map(Value::Text).collect();

    let result = store.execute(&sql, params)?;
    print_result(&result, output_format)
}
