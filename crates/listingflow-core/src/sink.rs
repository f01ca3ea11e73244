use chrono::NaiveDate;
use polars::prelude::*;
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder};
use tracing::info;

use crate::db::{quote_ident, DbPool};
use crate::error::{EtlError, Result};

/// Postgres caps a single statement at 65535 bind parameters; stay under it
/// with headroom.
const MAX_BIND_PARAMS: usize = 60_000;

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Replace `table` wholesale with the contents of `df`: drop, recreate from
/// the frame's schema, bulk insert. No primary key or index is defined, and
/// each statement is its own unit of work; a failure partway leaves the
/// table in whatever state the last statement produced.
pub async fn replace_table(pool: &DbPool, table: &str, df: &DataFrame) -> Result<()> {
    let table_ident = quote_ident(table);

    sqlx::query(&format!("DROP TABLE IF EXISTS {table_ident}"))
        .execute(pool)
        .await?;
    sqlx::query(&create_table_sql(table, df)?)
        .execute(pool)
        .await?;

    if df.height() > 0 {
        insert_rows(pool, &table_ident, df).await?;
    }

    info!(table, rows = df.height(), "replaced destination table");
    Ok(())
}

pub fn create_table_sql(table: &str, df: &DataFrame) -> Result<String> {
    let mut definitions = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        definitions.push(format!(
            "{} {}",
            quote_ident(column.name().as_str()),
            pg_type(column.name().as_str(), column.dtype())?
        ));
    }
    Ok(format!(
        "CREATE TABLE {} ({})",
        quote_ident(table),
        definitions.join(", ")
    ))
}

fn pg_type(name: &str, dtype: &DataType) -> Result<&'static str> {
    match dtype {
        DataType::Int32 => Ok("INTEGER"),
        DataType::Int64 | DataType::UInt32 => Ok("BIGINT"),
        DataType::Float64 => Ok("DOUBLE PRECISION"),
        DataType::String => Ok("TEXT"),
        DataType::Date => Ok("DATE"),
        DataType::Boolean => Ok("BOOLEAN"),
        other => Err(EtlError::Validation(format!(
            "column '{name}' has type {other:?}, which the sink cannot map to Postgres"
        ))),
    }
}

enum ColumnValues<'a> {
    Int32(&'a Int32Chunked),
    Int64(&'a Int64Chunked),
    UInt32(&'a UInt32Chunked),
    Float64(&'a Float64Chunked),
    Str(&'a StringChunked),
    Date(&'a DateChunked),
    Bool(&'a BooleanChunked),
}

impl<'a> ColumnValues<'a> {
    fn from_series(series: &'a Series) -> Result<Self> {
        let values = match series.dtype() {
            DataType::Int32 => ColumnValues::Int32(series.i32()?),
            DataType::Int64 => ColumnValues::Int64(series.i64()?),
            DataType::UInt32 => ColumnValues::UInt32(series.u32()?),
            DataType::Float64 => ColumnValues::Float64(series.f64()?),
            DataType::String => ColumnValues::Str(series.str()?),
            DataType::Date => ColumnValues::Date(series.date()?),
            DataType::Boolean => ColumnValues::Bool(series.bool()?),
            other => {
                return Err(EtlError::Validation(format!(
                    "column '{}' has type {other:?}, which the sink cannot bind",
                    series.name()
                )))
            }
        };
        Ok(values)
    }

    fn push_bind(&self, row: &mut Separated<'_, 'a, Postgres, &'static str>, idx: usize) {
        match self {
            ColumnValues::Int32(ca) => {
                row.push_bind(ca.get(idx));
            }
            ColumnValues::Int64(ca) => {
                row.push_bind(ca.get(idx));
            }
            ColumnValues::UInt32(ca) => {
                row.push_bind(ca.get(idx).map(|v| v as i64));
            }
            ColumnValues::Float64(ca) => {
                row.push_bind(ca.get(idx));
            }
            ColumnValues::Str(ca) => {
                row.push_bind(ca.get(idx));
            }
            ColumnValues::Date(ca) => {
                row.push_bind(ca.get(idx).and_then(days_to_date));
            }
            ColumnValues::Bool(ca) => {
                row.push_bind(ca.get(idx));
            }
        }
    }
}

fn days_to_date(days_since_epoch: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days_since_epoch + UNIX_EPOCH_DAYS_FROM_CE)
}

pub(crate) fn max_rows_per_insert(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).max(1)
}

async fn insert_rows(pool: &DbPool, table_ident: &str, df: &DataFrame) -> Result<()> {
    let columns = df.get_columns();
    let mut names = Vec::with_capacity(columns.len());
    let mut values = Vec::with_capacity(columns.len());
    for column in columns {
        names.push(quote_ident(column.name().as_str()));
        values.push(ColumnValues::from_series(column.as_materialized_series())?);
    }

    let insert_prefix = format!("INSERT INTO {} ({}) ", table_ident, names.join(", "));
    let chunk_rows = max_rows_per_insert(columns.len());

    let mut start = 0;
    while start < df.height() {
        let end = (start + chunk_rows).min(df.height());
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&insert_prefix);
        builder.push_values(start..end, |mut row, idx| {
            for column in &values {
                column.push_bind(&mut row, idx);
            }
        });
        builder.build().execute(pool).await?;
        start = end;
    }

    Ok(())
}
