use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::error::{EtlError, Result};
use crate::{loader, schema, sink, transform};

/// Counters reported after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub rows_loaded: usize,
    pub duplicates_removed: usize,
    pub rows_written: usize,
    pub columns_written: usize,
    pub listings_table: String,
    pub transformed_table: String,
}

/// Execute the five stages in order: provision, load, transform, sink.
/// The first unrecoverable error aborts the run; there is no partial-success
/// reporting.
pub async fn run(config: &Config) -> Result<RunReport> {
    config.validate()?;
    let input_path = config
        .input_path
        .as_deref()
        .ok_or(EtlError::MissingEnv("LISTINGS_CSV_PATH"))?;

    info!(stage = "provision", "ensuring destination schema");
    let pool = db::connect(&config.database_url).await?;
    schema::ensure_listings_table(&pool, &config.listings_table).await?;

    info!(stage = "load", path = %input_path.display(), "reading source csv");
    let raw = loader::load_listings(input_path)?;
    let rows_loaded = raw.height();

    info!(stage = "transform", rows = rows_loaded, "transforming listings");
    let transformed = transform::transform_listings(raw)?;

    info!(
        stage = "sink",
        table = %config.transformed_table,
        rows = transformed.height(),
        "writing transformed listings"
    );
    sink::replace_table(&pool, &config.transformed_table, &transformed).await?;

    let report = RunReport {
        rows_loaded,
        duplicates_removed: rows_loaded - transformed.height(),
        rows_written: transformed.height(),
        columns_written: transformed.width(),
        listings_table: config.listings_table.clone(),
        transformed_table: config.transformed_table.clone(),
    };
    info!(
        rows_written = report.rows_written,
        duplicates_removed = report.duplicates_removed,
        "pipeline completed"
    );
    Ok(report)
}

/// Provision-only entry point for the CLI.
pub async fn provision(config: &Config) -> Result<()> {
    config.validate()?;
    let pool = db::connect(&config.database_url).await?;
    schema::ensure_listings_table(&pool, &config.listings_table).await?;
    Ok(())
}
