pub mod execute;
pub mod save;
pub mod select;
pub mod tables;
pub mod var;

use anyhow::Result;
use scraperwiki::output::render;
use scraperwiki::{OutputFormat, QueryResult};

pub(crate) fn print_result(result: &QueryResult, format: OutputFormat) -> Result<()> {
    if result.keys.is_empty() {
        return Ok(());
    }
    println!("{}", render(result, format)?);
    Ok(())
}
