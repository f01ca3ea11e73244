// crates/listingflow-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("Input file contains no data rows: {}", path.display())]
    EmptyInput { path: PathBuf },

    #[error("Missing configuration value: {0}")]
    MissingEnv(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
