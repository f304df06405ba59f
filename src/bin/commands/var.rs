use anyhow::{anyhow, Result};
use clap::{Subcommand, ValueEnum};
use scraperwiki::output::render_value;
use scraperwiki::{OutputFormat, Store, Value};

#[derive(Subcommand)]
pub enum VarCommands {
    /// Print the value stored under NAME
    Get {
        name: String,
    },

    /// Store VALUE under NAME, replacing any previous value
    Set {
        name: String,
        value: String,

        /// How to interpret VALUE
        #[clap(short, long, value_enum, default_value_t = VarKind::Text)]
        kind: VarKind,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum VarKind {
    Text,
    Int,
    Float,
    Bool,
}

fn parse_value(raw: &str, kind: VarKind) -> Result<Value> {
    let value = match kind {
        VarKind::Text => Value::Text(raw.to_string()),
        VarKind::Int => Value::Integer(
            raw.parse()
                .map_err(|e| anyhow!("Invalid integer '{}': {}", raw, e))?,
        ),
        VarKind::Float => Value::Real(
            raw.parse()
                .map_err(|e| anyhow!("Invalid float '{}': {}", raw, e))?,
        ),
        VarKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Value::Boolean(true),
            "false" | "0" | "no" => Value::Boolean(false),
            _ => return Err(anyhow!("Invalid boolean '{}'", raw)),
        },
    };
    Ok(value)
}

pub fn run(store: &Store, command: VarCommands, output_format: OutputFormat) -> Result<()> {
    match command {
        VarCommands::Get { name } => match store.get_var(&name)? {
            Some(value) => println!("{}", render_value(&value, output_format)?),
            None => return Err(anyhow!("No variable named '{}'", name)),
        },
        VarCommands::Set { name, value, kind } => {
            store.save_var(&name, parse_value(&value, kind)?)?;
        }
    }
    Ok(())
}
