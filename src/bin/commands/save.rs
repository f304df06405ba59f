use anyhow::{anyhow, Result};
use clap::Args;
use scraperwiki::{OutputFormat, Record, Store};

/// Arguments for the Save command
#[derive(Args)]
pub struct SaveArgs {
    /// Target table, by default the configured default table
    #[clap(short, long)]
    pub table: Option<String>,

    /// Unique key column; repeat for composite keys
    #[clap(short, long = "unique")]
    pub unique_keys: Vec<String>,

    /// A JSON object or an array of objects; `-` reads stdin
    pub json: String,
}

pub fn run(store: &Store, args: SaveArgs, output_format: OutputFormat) -> Result<()> {
    let SaveArgs {
        table,
        unique_keys,
        json,
    } = args;

    let text = if json == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        json
    };
    let parsed: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| anyhow!("Invalid JSON input: {}", e))?;
    let records = Record::from_json(parsed)?;

    let keys: Vec<&str> = unique_keys.iter().map(String::as_str).collect();
    let count = records.len();
    store.save(&keys, records, table.as_deref())?;

    let table = table.as_deref().unwrap_or(store.default_table());
    if output_format.is_json() {
        println!(
            "{}",
            serde_json::json!({ "table": table, "saved": count })
        );
    } else {
        println!("Saved {} record(s) to {}", count, table);
    }
    Ok(())
}
