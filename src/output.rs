//! Output formats for query results
//!
//! Every command result is shaped as a [`QueryResult`] (column names plus
//! row tuples) and rendered through [`render`].

use anyhow::Result;
use std::fmt;
use std::str::FromStr;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::database::{QueryResult, Record, Value};

/// How the CLI prints rows, variables and table listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Markdown,
    /// One JSON array of row objects keyed by column name
    Json,
    JsonPretty,
    /// One row object per line
    JsonLine,
    /// Header line of column names, then `|`-joined cells; NULL is empty
    Psv,
}

impl OutputFormat {
    const NAMES: [(&'static str, OutputFormat); 6] = [
        ("table", OutputFormat::Table),
        ("markdown", OutputFormat::Markdown),
        ("json", OutputFormat::Json),
        ("json-pretty", OutputFormat::JsonPretty),
        ("json-line", OutputFormat::JsonLine),
        ("psv", OutputFormat::Psv),
    ];

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    fn name(&self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, format)| format == self)
            .map(|(name, _)| *name)
            .unwrap_or("table")
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, format)| *format)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::NAMES.iter().map(|(name, _)| *name).collect();
                format!("Unknown output format '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Render a query result in the given format
pub fn render(result: &QueryResult, format: OutputFormat) -> Result<String> {
    let out = match format {
        OutputFormat::Table => table(result, false),
        OutputFormat::Markdown => table(result, true),
        OutputFormat::Json => serde_json::to_string(&records(result))?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&records(result))?,
        OutputFormat::JsonLine => {
            let mut lines = Vec::with_capacity(result.data.len());
            for record in records(result) {
                lines.push(serde_json::to_string(&record)?);
            }
            lines.join("\n")
        }
        OutputFormat::Psv => {
            let mut lines = vec![result.keys.join("|")];
            for row in &result.data {
                lines.push(row.iter().map(cell).collect::<Vec<_>>().join("|"));
            }
            lines.join("\n")
        }
    };
    Ok(out)
}

/// Render a single value; JSON formats emit the JSON scalar
pub fn render_value(value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
        f if f.is_json() => Ok(serde_json::to_string(value)?),
        _ => Ok(cell(value)),
    }
}

fn records(result: &QueryResult) -> Vec<Record> {
    result.clone().into_records()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn table(result: &QueryResult, markdown: bool) -> String {
    let mut builder = Builder::default();
    builder.push_record(result.keys.iter().cloned());
    for row in &result.data {
        builder.push_record(row.iter().map(cell));
    }
    let mut table = builder.build();
    if markdown {
        table.with(Style::markdown());
    } else {
        table.with(Style::rounded());
    }
    table.to_string()
}
