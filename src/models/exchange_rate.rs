use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{currencies, exchange_rates};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRangeQuery {
    pub base_code: String,
    pub quote_code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestRateQuery {
    pub base_code: String,
    pub quote_code: String,
}

/// Body of a manual rate entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExchangeRateRequest {
    pub base_currency_code: String,
    pub quote_currency_code: String,
    pub rate: Decimal,
    pub timestamp: NaiveDateTime,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateResponse {
    pub id: i32,
    pub base_currency_code: String,
    pub base_currency_name: String,
    pub quote_currency_code: String,
    pub quote_currency_name: String,
    pub rate: Decimal,
    pub timestamp: NaiveDateTime,
    pub source: Option<String>,
}

impl ExchangeRateResponse {
    pub fn from_model(
        rate: exchange_rates::Model,
        base: &currencies::Model,
        quote: &currencies::Model,
    ) -> Self {
        Self {
            id: rate.id,
            base_currency_code: base.code.clone(),
            base_currency_name: base.name.clone(),
            quote_currency_code: quote.code.clone(),
            quote_currency_name: quote.name.clone(),
            rate: rate.rate,
            timestamp: rate.timestamp,
            source: rate.source,
        }
    }
}
