use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use listingflow_core::{config::Config, pipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Listings CSV to Postgres batch ETL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: provision, load, transform, sink
    Run(RunArgs),
    /// Only ensure the raw listings table exists
    Provision,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Path to the listings CSV (overrides LISTINGS_CSV_PATH)
    #[arg(long)]
    input: Option<PathBuf>,

    /// DDL target table (overrides LISTINGS_TABLE)
    #[arg(long)]
    listings_table: Option<String>,

    /// Sink target table (overrides TRANSFORMED_TABLE)
    #[arg(long)]
    output_table: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let mut config = Config::from_env()?;
            if let Some(input) = args.input {
                config.input_path = Some(input);
            }
            if let Some(table) = args.listings_table {
                config.listings_table = table;
            }
            if let Some(table) = args.output_table {
                config.transformed_table = table;
            }

            let report = pipeline::run(&config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Provision => {
            let config = Config::from_env()?;
            pipeline::provision(&config).await?;
            info!(table = %config.listings_table, "schema provisioned");
            Ok(())
        }
    }
}
