use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::error::Result;

pub type DbPool = Pool<Postgres>;

/// Establish a new Postgres connection pool using sensible defaults for a
/// single batch run.
pub async fn connect(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Quote a table or column name for interpolation into DDL. Names are
/// validated upstream; quoting keeps reserved words usable.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::quote_ident;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("listings"), "\"listings\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
