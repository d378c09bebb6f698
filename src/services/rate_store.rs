//! Exchange rate persistence and lookups.
//!
//! Rows are unique on (base_currency_id, quote_currency_id, timestamp). Batch
//! inserts rely on that index and turn conflicting rows into no-ops, so two
//! overlapping sync runs can never write the same key twice.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, sea_query::OnConflict,
};
use thiserror::Error;

use crate::entities::{exchange_rates, prelude::*};
use crate::error::{AppError, AppResult};

/// Fractional digits kept for every stored rate.
pub const RATE_SCALE: u32 = 6;

/// Source tag for rates entered by hand.
pub const MANUAL_SOURCE: &str = "MANUAL";

/// decimal(19, 6) leaves 13 integer digits.
pub const MAX_INTEGER_DIGITS: u32 = 13;

const AUDIT_USER: &str = "SYSTEM";

/// Why a rate cannot be stored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateBoundsError {
    #[error("Rate must be greater than 0")]
    NotPositive,

    #[error("Rate must have at most {} integer digits", MAX_INTEGER_DIGITS)]
    TooLarge,
}

/// Check that a rate fits the `rate` column once rounded to [`RATE_SCALE`].
pub fn check_rate_bounds(rate: Decimal) -> Result<(), RateBoundsError> {
    let rounded = rate.round_dp(RATE_SCALE);
    if rounded <= Decimal::ZERO {
        return Err(RateBoundsError::NotPositive);
    }
    if rounded >= Decimal::from(10_i64.pow(MAX_INTEGER_DIGITS)) {
        return Err(RateBoundsError::TooLarge);
    }
    Ok(())
}

/// A rate about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExchangeRate {
    pub base_currency_id: i32,
    pub quote_currency_id: i32,
    pub rate: Decimal,
    pub timestamp: NaiveDateTime,
    pub source: String,
}

impl NewExchangeRate {
    fn into_active_model(self, now: NaiveDateTime) -> exchange_rates::ActiveModel {
        exchange_rates::ActiveModel {
            base_currency_id: Set(self.base_currency_id),
            quote_currency_id: Set(self.quote_currency_id),
            rate: Set(self.rate.round_dp(RATE_SCALE)),
            timestamp: Set(self.timestamp),
            source: Set(Some(self.source)),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(Some(AUDIT_USER.to_string())),
            updated_by: Set(Some(AUDIT_USER.to_string())),
            ..Default::default()
        }
    }
}

/// Start of `start` through the last second of `end`.
pub fn day_bounds(start: NaiveDate, end: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    (start.and_time(NaiveTime::MIN), end.and_time(last_second))
}

fn normalize(mut model: exchange_rates::Model) -> exchange_rates::Model {
    model.rate = model.rate.round_dp(RATE_SCALE);
    model
}

/// Rates for a pair with `start <= timestamp <= end`, oldest first.
pub async fn find_range(
    db: &DatabaseConnection,
    base_currency_id: i32,
    quote_currency_id: i32,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<exchange_rates::Model>, DbErr> {
    let rates = ExchangeRates::find()
        .filter(exchange_rates::Column::BaseCurrencyId.eq(base_currency_id))
        .filter(exchange_rates::Column::QuoteCurrencyId.eq(quote_currency_id))
        .filter(exchange_rates::Column::Timestamp.gte(start))
        .filter(exchange_rates::Column::Timestamp.lte(end))
        .order_by_asc(exchange_rates::Column::Timestamp)
        .all(db)
        .await?;

    Ok(rates.into_iter().map(normalize).collect())
}

pub async fn find_latest(
    db: &DatabaseConnection,
    base_currency_id: i32,
    quote_currency_id: i32,
) -> AppResult<exchange_rates::Model> {
    ExchangeRates::find()
        .filter(exchange_rates::Column::BaseCurrencyId.eq(base_currency_id))
        .filter(exchange_rates::Column::QuoteCurrencyId.eq(quote_currency_id))
        .order_by_desc(exchange_rates::Column::Timestamp)
        .one(db)
        .await?
        .map(normalize)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Exchange rate not found for base currency {} and quote currency {}",
                base_currency_id, quote_currency_id
            ))
        })
}

/// Point lookup on the unique (base, quote, timestamp) index.
pub async fn exists_at(
    db: &DatabaseConnection,
    base_currency_id: i32,
    quote_currency_id: i32,
    timestamp: NaiveDateTime,
) -> Result<bool, DbErr> {
    let existing = ExchangeRates::find()
        .filter(exchange_rates::Column::BaseCurrencyId.eq(base_currency_id))
        .filter(exchange_rates::Column::QuoteCurrencyId.eq(quote_currency_id))
        .filter(exchange_rates::Column::Timestamp.eq(timestamp))
        .one(db)
        .await?;

    Ok(existing.is_some())
}

/// Append rates in one statement and return how many rows were written.
///
/// Rows whose key already exists are skipped by the database.
pub async fn insert_batch(
    db: &DatabaseConnection,
    records: Vec<NewExchangeRate>,
) -> Result<u64, DbErr> {
    if records.is_empty() {
        return Ok(0);
    }

    let now = Utc::now().naive_utc();
    let models: Vec<exchange_rates::ActiveModel> = records
        .into_iter()
        .map(|r| r.into_active_model(now))
        .collect();

    ExchangeRates::insert_many(models)
        .on_conflict(
            OnConflict::columns([
                exchange_rates::Column::BaseCurrencyId,
                exchange_rates::Column::QuoteCurrencyId,
                exchange_rates::Column::Timestamp,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
}

/// Insert a single rate; an existing key is a conflict.
pub async fn insert_one(
    db: &DatabaseConnection,
    record: NewExchangeRate,
) -> AppResult<exchange_rates::Model> {
    if exists_at(db, record.base_currency_id, record.quote_currency_id, record.timestamp).await? {
        return Err(duplicate_rate_error());
    }

    let now = Utc::now().naive_utc();
    match record.into_active_model(now).insert(db).await {
        Ok(model) => Ok(normalize(model)),
        // Lost a race with a concurrent writer
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(duplicate_rate_error())
        }
        Err(e) => Err(e.into()),
    }
}

fn duplicate_rate_error() -> AppError {
    AppError::Conflict(
        "Exchange rate already exists for the specified date and currency pair".to_string(),
    )
}
