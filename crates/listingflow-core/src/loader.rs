use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::{EtlError, Result};

/// Header the source CSV must carry, in the order the upstream export
/// produces it. Column order in the file is not enforced, presence is.
pub const EXPECTED_COLUMNS: [&str; 16] = [
    "id",
    "name",
    "host_id",
    "host_name",
    "neighbourhood_group",
    "neighbourhood",
    "latitude",
    "longitude",
    "room_type",
    "price",
    "minimum_nights",
    "number_of_reviews",
    "last_review",
    "reviews_per_month",
    "calculated_host_listings_count",
    "availability_365",
];

/// Read the listings CSV into a DataFrame. Missing or empty files abort the
/// run immediately; neither condition is transient.
pub fn load_listings(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(EtlError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    // A zero-byte file would otherwise surface as a parse error.
    if std::fs::metadata(path)?.len() == 0 {
        return Err(EtlError::EmptyInput {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    if df.height() == 0 {
        return Err(EtlError::EmptyInput {
            path: path.to_path_buf(),
        });
    }

    let missing: Vec<&str> = EXPECTED_COLUMNS
        .iter()
        .copied()
        .filter(|name| df.column(name).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::Validation(format!(
            "input file {} is missing expected columns: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    info!(rows = df.height(), path = %path.display(), "loaded listings csv");
    Ok(df)
}
