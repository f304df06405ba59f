use anyhow::Result;
use clap::Args;
use scraperwiki::{OutputFormat, Store};

use super::print_result;

/// Arguments for the Select command
#[derive(Args)]
pub struct SelectArgs {
    /// Query text following `SELECT`, e.g. `* FROM swdata LIMIT 10`
    #[clap(required = true)]
    pub suffix: Vec<String>,
}

pub fn run(store: &Store, args: SelectArgs, output_format: OutputFormat) -> Result<()> {
    let sql = format!("SELECT {}", args.suffix.join(" "));
    let result = store.execute(&sql, ())?;
    print_result(&result, output_format)
}
