use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::db::{quote_ident, DbPool};
use crate::error::Result;

pub const DDL_RETRY_ATTEMPTS: u32 = 3;
pub const DDL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Ensure the raw listings table exists. The statement is idempotent
/// (`CREATE TABLE IF NOT EXISTS`) and safe to re-run; transient failures are
/// retried with a fixed delay before the error is propagated.
pub async fn ensure_listings_table(pool: &DbPool, table: &str) -> Result<()> {
    let ddl = listings_table_ddl(table);
    execute_with_retry(DDL_RETRY_ATTEMPTS, DDL_RETRY_DELAY, || {
        let pool = pool.clone();
        let ddl = ddl.clone();
        async move {
            sqlx::query(&ddl).execute(&pool).await?;
            Ok(())
        }
    })
    .await?;
    info!(table, "listings table ensured");
    Ok(())
}

pub fn listings_table_ddl(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id SERIAL PRIMARY KEY,
            name TEXT,
            host_id INTEGER,
            host_name TEXT,
            neighbourhood_group TEXT,
            neighbourhood TEXT,
            latitude DECIMAL,
            longitude DECIMAL,
            room_type TEXT,
            price INTEGER,
            minimum_nights INTEGER,
            number_of_reviews INTEGER,
            last_review DATE,
            reviews_per_month DECIMAL,
            calculated_host_listings_count INTEGER,
            availability_365 INTEGER
        )
        "#,
        quote_ident(table)
    )
}

/// Run `op` up to `attempts` times, sleeping `delay` between failures. The
/// last error is returned once the attempts are exhausted.
pub async fn execute_with_retry<T, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                warn!(attempt, error = %err, "statement failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::error::EtlError;

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let calls = Rc::new(Cell::new(0u32));
        let result = execute_with_retry(3, Duration::ZERO, || {
            let calls = calls.clone();
            async move {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(EtlError::Validation("transient".into()))
                } else {
                    Ok(calls.get())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_attempts_exhausted() {
        let calls = Rc::new(Cell::new(0u32));
        let result: Result<()> = execute_with_retry(3, Duration::ZERO, || {
            let calls = calls.clone();
            async move {
                calls.set(calls.get() + 1);
                Err(EtlError::Validation("still broken".into()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn ddl_is_idempotent_create() {
        let ddl = listings_table_ddl("listings");
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS \"listings\""));
        assert!(ddl.contains("last_review DATE"));
    }
}
