//! Client for the external FX quote provider.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::config::ProviderConfig;

pub const API_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Raw chart response. Either section may be missing on a bad response.
///
/// A malformed `meta` or `data` section reads as missing, a null date bucket
/// as empty and an unreadable entry as one without prices, so one bad piece
/// never discards the rest of the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuote {
    #[serde(default, deserialize_with = "lenient_meta")]
    pub meta: Option<QuoteMeta>,
    /// Keyed by `YYYY-MM-DD`; entries per date in provider order
    #[serde(default, deserialize_with = "lenient_buckets")]
    pub data: Option<BTreeMap<String, Vec<QuoteEntry>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteMeta {
    pub base: String,
    pub quote: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// One OHLC entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteEntry {
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub close: Option<QuotePrice>,
    #[serde(default)]
    pub high: Option<QuotePrice>,
    #[serde(default)]
    pub low: Option<QuotePrice>,
    #[serde(default)]
    pub open: Option<QuotePrice>,
}

/// A price as sent by the provider: usually a decimal string, sometimes a
/// JSON number. Anything else is kept so the parser can reject it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuotePrice {
    Text(String),
    Number(Number),
    Other(Value),
}

impl QuotePrice {
    pub fn text(value: impl Into<String>) -> Self {
        QuotePrice::Text(value.into())
    }
}

impl fmt::Display for QuotePrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotePrice::Text(s) => write!(f, "{}", s),
            QuotePrice::Number(n) => write!(f, "{}", n),
            QuotePrice::Other(v) => write!(f, "{}", v),
        }
    }
}

fn lenient_meta<'de, D>(deserializer: D) -> Result<Option<QuoteMeta>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_buckets<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, Vec<QuoteEntry>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(buckets) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };

    Ok(Some(
        buckets
            .into_iter()
            .map(|(date, bucket)| (date, bucket_entries(bucket)))
            .collect(),
    ))
}

fn bucket_entries(bucket: Value) -> Vec<QuoteEntry> {
    match bucket {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        // Not a list: one unusable entry, so the date is rejected
        _ => vec![QuoteEntry::default()],
    }
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Source tag stored on the rates this provider produces.
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        base: &str,
        quote: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RawQuote, ProviderError>;
}

/// HTTP client for the OANDA-style `/currencies` chart endpoint.
#[derive(Clone)]
pub struct HttpQuoteProvider {
    client: Client,
    base_url: String,
    name: String,
}

impl HttpQuoteProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            name: config.name.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        base: &str,
        quote: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RawQuote, ProviderError> {
        let start = start_date.format(API_DATE_FORMAT).to_string();
        let end = end_date.format(API_DATE_FORMAT).to_string();

        tracing::info!(
            "Fetching quotes from {}: base={}, quote={}, start={}, end={}",
            self.name,
            base,
            quote,
            start,
            end
        );

        let url = format!("{}/currencies", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[
                ("base", base),
                ("quote", quote),
                ("data_type", "chart"),
                ("start_date", start.as_str()),
                ("end_date", end.as_str()),
            ])
            .send()
            .await?;

        tracing::debug!("{} responded {} for {}/{}", self.name, response.status(), base, quote);

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let raw: RawQuote = response.json().await?;
        Ok(raw)
    }
}
