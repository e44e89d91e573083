use std::path::{Path, PathBuf};

use clap::Parser;
use env_logger::Env;

use crate::schema::SchemaVersion;

mod convert;
mod encoding;
mod schema;

#[derive(Parser)]
#[clap(author, version, about = "Transform Erste CSV to be Wallet friendly", long_about = None)]
struct Cli {
    /// ERSTE CSV input file
    input_file: PathBuf,

    /// Statement schema generation; detected from the header row when omitted
    #[clap(long, value_enum)]
    schema: Option<SchemaVersion>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli: Cli = Cli::parse();
    if !cli.input_file.is_file() {
        println!("ERROR: Missing CSV input file");
        return Ok(());
    }

    let output_file = wallet_output_path(&cli.input_file);
    convert::transform_csv(&cli.input_file, &output_file, cli.schema)
}

/// statement.csv -> statement_w.csv, next to the input.
fn wallet_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let mut name = format!("{}_w", stem);
    if let Some(extension) = input.extension().and_then(|s| s.to_str()) {
        name.push('.');
        name.push_str(extension);
    }
    input.with_file_name(name)
}
