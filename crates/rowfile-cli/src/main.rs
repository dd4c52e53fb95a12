use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use rowfile_core::{Cursor, FormatDescriptor, LineStore, Table};
use tracing::debug;

mod commands;
mod display;
mod executor;

use commands::Command;
use display::OutputMode;

/// rowfile: query and edit a single-file delimited table.
#[derive(Parser, Debug)]
#[command(name = "rowfile", version)]
struct Cli {
    /// Table file (created if missing).
    #[arg(short, long)]
    file: PathBuf,

    /// Column labels, comma-separated; the first is the primary key.
    #[arg(short, long, value_delimiter = ',', default_value = "key,value")]
    columns: Vec<String>,

    /// Table name (default: the file stem).
    #[arg(short, long)]
    name: Option<String>,

    /// JSON file with separators and substitutes (default: `,` and newline).
    #[arg(long, value_name = "FORMAT.json")]
    format: Option<PathBuf>,

    /// Output results as machine-parseable JSON.
    #[arg(short, long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn table_name(cli: &Cli) -> String {
    cli.name.clone().unwrap_or_else(|| {
        cli.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string())
    })
}

fn load_format(path: Option<&Path>) -> rowfile_core::Result<FormatDescriptor> {
    match path {
        Some(path) => Ok(FormatDescriptor::load(path)?),
        None => Ok(FormatDescriptor::default()),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Pretty
    };

    let format = match load_format(cli.format.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Invalid format file: {e}");
            process::exit(1);
        }
    };

    let store = match LineStore::open(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Cannot open {}: {e}", cli.file.display());
            process::exit(1);
        }
    };

    let cursor = match Cursor::open(store, format) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Cannot index {}: {e}", cli.file.display());
            process::exit(1);
        }
    };

    let name = table_name(&cli);
    debug!(table = %name, columns = ?cli.columns, "table ready");
    let mut table = Table::new(cursor, cli.columns, name);

    match executor::execute(&mut table, cli.command) {
        Ok(result) => display::render(&result, &mode),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
