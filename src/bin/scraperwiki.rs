use clap::{Parser, Subcommand};
use scraperwiki::{OutputFormat, ScraperwikiConfig, Store};
use tracing::Level;

mod commands;

use commands::execute::ExecuteArgs;
use commands::save::SaveArgs;
use commands::select::SelectArgs;
use commands::var::VarCommands;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default ./scraperwiki.toml is used when present
    #[clap(short, long)]
    config: Option<String>,

    /// store file, overrides the configured database path
    #[clap(short, long)]
    database: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a SQL statement with positional parameters
    Execute(ExecuteArgs),

    /// Run `SELECT <suffix>` and print the rows
    Select(SelectArgs),

    /// Save JSON records, creating tables and columns as needed
    Save(SaveArgs),

    /// Get or set named variables
    Var {
        #[clap(subcommand)]
        command: VarCommands,
    },

    /// List tables in the store
    Tables,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level DEBUG or higher.
            .with_max_level(Level::DEBUG)
            .init();
    }

    let mut config = match ScraperwikiConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(path) = cli.database {
        config.database_path = path;
    }

    let mut store = Store::new(&config);
    let format = cli.format;

    let result = match cli.command {
        Commands::Execute(args) => commands::execute::run(&store, args, format),
        Commands::Select(args) => commands::select::run(&store, args, format),
        Commands::Save(args) => commands::save::run(&store, args, format),
        Commands::Var { command } => commands::var::run(&store, command, format),
        Commands::Tables => commands::tables::run(&store, format),
    };

    let closed = store.close();
    if let Err(e) = result.and(closed) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
