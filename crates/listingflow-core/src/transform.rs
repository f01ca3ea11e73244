use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tracing::info;

use crate::error::Result;

const TEXT_FIELDS: [&str; 3] = ["host_name", "neighbourhood", "neighbourhood_group"];
const INT32_FIELDS: [&str; 3] = ["host_id", "price", "number_of_reviews"];
const COORDINATE_FIELDS: [&str; 2] = ["latitude", "longitude"];

/// Full transformation pass over the raw listings frame. Pure with respect
/// to the database; nulls flow through derived columns instead of failing
/// the run.
pub fn transform_listings(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;

    title_case_text_fields(&mut df)?;
    derive_last_review_parts(&mut df)?;
    expand_room_type_labels(&mut df)?;
    fill_missing_review_rates(&mut df)?;
    add_price_per_night(&mut df)?;
    round_coordinates(&mut df)?;
    encode_category(&mut df, "room_type", "room_type_code")?;
    encode_category(&mut df, "neighbourhood_group", "neighbourhood_group_code")?;

    let before = df.height();
    let mut df = df
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    info!(
        rows = df.height(),
        duplicates_removed = before - df.height(),
        "deduplicated listings"
    );

    cast_count_fields(&mut df)?;
    let enriched = join_neighbourhood_metrics(df)?;

    Ok(enriched)
}

/// Python-style title casing: uppercase every letter that follows a
/// non-alphabetic character, lowercase the rest.
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn title_case_text_fields(df: &mut DataFrame) -> Result<()> {
    for name in TEXT_FIELDS {
        let values: Vec<Option<String>> = df
            .column(name)?
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|value| value.map(title_case))
            .collect();
        df.replace(name, Series::new(name.into(), values))?;
    }
    Ok(())
}

static REVIEW_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

fn parse_review_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    REVIEW_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Split `last_review` into six derived columns. Source values are
/// date-only, so the time component is always midnight when present.
fn derive_last_review_parts(df: &mut DataFrame) -> Result<()> {
    let raw = df
        .column("last_review")?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let raw = raw.str()?;

    let len = df.height();
    let mut date_days: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut times: Vec<Option<&'static str>> = Vec::with_capacity(len);
    let mut years: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut months: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut days: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut weekdays: Vec<Option<i32>> = Vec::with_capacity(len);

    for value in raw.into_iter() {
        match value.and_then(parse_review_date) {
            Some(date) => {
                date_days.push(Some(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE));
                times.push(Some("00:00:00"));
                years.push(Some(date.year()));
                months.push(Some(date.month() as i32));
                days.push(Some(date.day() as i32));
                weekdays.push(Some(date.weekday().num_days_from_monday() as i32));
            }
            None => {
                date_days.push(None);
                times.push(None);
                years.push(None);
                months.push(None);
                days.push(None);
                weekdays.push(None);
            }
        }
    }

    let date_series = Series::new("last_review_date".into(), date_days).cast(&DataType::Date)?;

    df.hstack_mut(&mut [
        date_series.into(),
        Series::new("last_review_time".into(), times).into(),
        Series::new("last_review_year".into(), years).into(),
        Series::new("last_review_month".into(), months).into(),
        Series::new("last_review_day".into(), days).into(),
        Series::new("last_review_day_of_week".into(), weekdays).into(),
    ])?;

    Ok(())
}

fn expand_room_type_labels(df: &mut DataFrame) -> Result<()> {
    let values: Vec<Option<String>> = df
        .column("room_type")?
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|value| {
            value.map(|label| {
                match label {
                    "Entire home/apt" => "Entire Home/Apartment",
                    "Private room" => "Private Room",
                    "Shared room" => "Shared Room",
                    other => other,
                }
                .to_string()
            })
        })
        .collect();
    df.replace("room_type", Series::new("room_type".into(), values))?;
    Ok(())
}

fn fill_missing_review_rates(df: &mut DataFrame) -> Result<()> {
    let filled = df
        .column("reviews_per_month")?
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .fill_null(FillNullStrategy::Zero)?;
    df.replace("reviews_per_month", filled)?;
    Ok(())
}

/// price / minimum_nights. Zero nights produces an infinity per IEEE
/// division; the original left that uncorrected and so do we.
fn add_price_per_night(df: &mut DataFrame) -> Result<()> {
    let price = df
        .column("price")?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let nights = df
        .column("minimum_nights")?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let price = price.f64()?;
    let nights = nights.f64()?;

    let mut values: Vec<Option<f64>> = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(match (price.get(idx), nights.get(idx)) {
            (Some(p), Some(n)) => Some(p / n),
            _ => None,
        });
    }

    df.hstack_mut(&mut [Series::new("price_per_night".into(), values).into()])?;
    Ok(())
}

fn round_coordinates(df: &mut DataFrame) -> Result<()> {
    for name in COORDINATE_FIELDS {
        let rounded: Vec<Option<f64>> = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|value| value.map(|v| (v * 1000.0).round() / 1000.0))
            .collect();
        df.replace(name, Series::new(name.into(), rounded))?;
    }
    Ok(())
}

/// Dense integer codes in first-seen order. Null labels stay null rather
/// than receiving a sentinel code.
fn encode_category(df: &mut DataFrame, column: &str, code_column: &str) -> Result<()> {
    let codes: Vec<Option<i32>> = {
        let labels = df.column(column)?.as_materialized_series().str()?.clone();
        let mut seen: HashMap<String, i32> = HashMap::new();
        let mut next_code: i32 = 0;
        labels
            .into_iter()
            .map(|value| {
                value.map(|label| {
                    *seen.entry(label.to_string()).or_insert_with(|| {
                        let code = next_code;
                        next_code += 1;
                        code
                    })
                })
            })
            .collect()
    };

    df.hstack_mut(&mut [Series::new(code_column.into(), codes).into()])?;
    Ok(())
}

fn cast_count_fields(df: &mut DataFrame) -> Result<()> {
    for name in INT32_FIELDS {
        let cast = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::Int32)?;
        df.replace(name, cast)?;
    }
    Ok(())
}

/// Neighbourhood-level aggregates, merged back onto every row. Rows with a
/// null neighbourhood never match a group and keep null aggregates.
fn join_neighbourhood_metrics(df: DataFrame) -> Result<DataFrame> {
    let metrics = df
        .clone()
        .lazy()
        .group_by([col("neighbourhood")])
        .agg([
            col("price").mean().alias("avg_price"),
            col("number_of_reviews").mean().alias("avg_reviews"),
            col("minimum_nights").mean().alias("avg_minimum_nights"),
            len().alias("total_listings"),
        ])
        .with_column(col("total_listings").cast(DataType::Int64));

    // Row order carries through to the sink, so pin it across the join.
    let mut join_args = JoinArgs::new(JoinType::Left);
    join_args.maintain_order = MaintainOrderJoin::Left;

    let enriched = df
        .lazy()
        .join(
            metrics,
            [col("neighbourhood")],
            [col("neighbourhood")],
            join_args,
        )
        .collect()?;

    Ok(enriched)
}
