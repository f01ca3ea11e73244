use std::env;
use std::path::PathBuf;

use crate::error::{EtlError, Result};

pub const DEFAULT_LISTINGS_TABLE: &str = "listings";
pub const DEFAULT_TRANSFORMED_TABLE: &str = "transformed_listings";

/// Runtime configuration for one pipeline run. Everything comes from the
/// environment; the CLI may override individual fields afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Optional until a `run` actually needs it; `provision` works without.
    pub input_path: Option<PathBuf>,
    /// DDL target ensured by the schema provisioner.
    pub listings_table: String,
    /// Sink target replaced wholesale with the transformed dataset.
    pub transformed_table: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| EtlError::MissingEnv("DATABASE_URL"))?;
        let input_path = env::var("LISTINGS_CSV_PATH").ok().map(PathBuf::from);
        let listings_table =
            env::var("LISTINGS_TABLE").unwrap_or_else(|_| DEFAULT_LISTINGS_TABLE.to_string());
        let transformed_table = env::var("TRANSFORMED_TABLE")
            .unwrap_or_else(|_| DEFAULT_TRANSFORMED_TABLE.to_string());

        let config = Self {
            database_url,
            input_path,
            listings_table,
            transformed_table,
        };
        config.validate()?;
        Ok(config)
    }

    /// Table names end up interpolated into DDL, so they must be plain
    /// identifiers regardless of where they came from.
    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.listings_table)?;
        validate_table_name(&self.transformed_table)?;
        if self.listings_table == self.transformed_table {
            return Err(EtlError::Validation(format!(
                "listings table and transformed table must differ, both are '{}'",
                self.listings_table
            )));
        }
        Ok(())
    }
}

pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EtlError::Validation(format!(
            "invalid table name '{name}': expected [A-Za-z_][A-Za-z0-9_]*"
        )))
    }
}
