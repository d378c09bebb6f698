//! Exchange rate synchronization engine.
//!
//! For every (base, quote) pair of the configured matrix the engine fetches the
//! trailing two-day window from the quote provider, turns each date entry into
//! a midday rate, drops keys that are already stored and appends the rest.
//! Every pair is isolated: a failure is recorded in the run report and the
//! remaining pairs carry on.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::stream::{self, StreamExt};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::SyncConfig;
use crate::entities::currencies;
use crate::error::AppError;
use crate::models::sync::{CurrencyPair, PairOutcome, PairReport, SyncReport};
use crate::services::currency_directory::CurrencyDirectory;
use crate::services::quote_provider::{API_DATE_FORMAT, QuoteEntry, QuotePrice, QuoteProvider};
use crate::services::rate_store::{self, NewExchangeRate, RATE_SCALE, RateBoundsError};

/// Days before "today" included in each run's window.
pub const WINDOW_LOOKBACK_DAYS: u64 = 1;

/// Provider quotes are daily closes; they are stored at this time of day.
pub fn observation_time() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Why a single date entry could not be turned into a rate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteParseError {
    #[error("invalid date format: {0}")]
    InvalidDate(String),

    #[error("missing close price for {0}")]
    MissingClose(String),

    #[error("invalid rate format for {date}: {value}")]
    InvalidRate { date: String, value: String },

    #[error("non-positive rate for {date}: {value}")]
    NonPositiveRate { date: String, value: String },

    #[error("rate too large for {date}: {value}")]
    RateTooLarge { date: String, value: String },
}

/// One provider date entry resolved to a storable point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuote {
    pub timestamp: NaiveDateTime,
    pub rate: Decimal,
}

/// Parse a single date bucket. Only the first entry of the bucket counts.
///
/// Returns `Ok(None)` for an empty bucket.
pub fn parse_quote_entry(
    date_key: &str,
    entries: &[QuoteEntry],
) -> Result<Option<ParsedQuote>, QuoteParseError> {
    let Some(first) = entries.first() else {
        return Ok(None);
    };

    let date = NaiveDate::parse_from_str(date_key.trim(), API_DATE_FORMAT)
        .map_err(|_| QuoteParseError::InvalidDate(date_key.to_string()))?;

    let close = match &first.close {
        None => return Err(QuoteParseError::MissingClose(date_key.to_string())),
        Some(QuotePrice::Text(text)) if text.trim().is_empty() => {
            return Err(QuoteParseError::MissingClose(date_key.to_string()));
        }
        Some(QuotePrice::Other(value)) => {
            return Err(QuoteParseError::InvalidRate {
                date: date_key.to_string(),
                value: value.to_string(),
            });
        }
        Some(price) => price.to_string(),
    };
    let close = close.trim();

    let rate = Decimal::from_str(close)
        .or_else(|_| Decimal::from_scientific(close))
        .map_err(|_| QuoteParseError::InvalidRate {
            date: date_key.to_string(),
            value: close.to_string(),
        })?;

    rate_store::check_rate_bounds(rate).map_err(|e| match e {
        RateBoundsError::NotPositive => QuoteParseError::NonPositiveRate {
            date: date_key.to_string(),
            value: close.to_string(),
        },
        RateBoundsError::TooLarge => QuoteParseError::RateTooLarge {
            date: date_key.to_string(),
            value: close.to_string(),
        },
    })?;

    Ok(Some(ParsedQuote {
        timestamp: date.and_time(observation_time()),
        rate: rate.round_dp(RATE_SCALE),
    }))
}

/// Parse every bucket of a response, skipping (and logging) bad entries.
///
/// Returns the parsed points in date order and the number of rejected buckets.
pub fn parse_quote_data(
    pair: &CurrencyPair,
    data: &BTreeMap<String, Vec<QuoteEntry>>,
) -> (Vec<ParsedQuote>, u64) {
    let mut parsed = Vec::with_capacity(data.len());
    let mut rejected = 0;

    for (date_key, entries) in data {
        match parse_quote_entry(date_key, entries) {
            Ok(Some(quote)) => parsed.push(quote),
            Ok(None) => {
                tracing::debug!("[{}] No quotes listed under {}", pair, date_key);
            }
            Err(e) => {
                tracing::warn!("[{}] Skipping quote entry: {}", pair, e);
                rejected += 1;
            }
        }
    }

    parsed.sort_by_key(|q| q.timestamp);
    (parsed, rejected)
}

/// Cross product of the configured currencies, self-pairs removed.
pub fn build_pair_matrix(config: &SyncConfig) -> Vec<CurrencyPair> {
    let mut pairs = Vec::new();

    for base in &config.base_currencies {
        for quote in &config.quote_currencies {
            if base == quote {
                continue;
            }
            let pair = CurrencyPair::new(base.clone(), quote.clone());
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
    }

    pairs
}

/// `(yesterday, today)` relative to `today`.
pub fn quote_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(WINDOW_LOOKBACK_DAYS))
        .unwrap_or(today);
    (start, today)
}

#[derive(Clone)]
pub struct SyncEngine {
    db: DatabaseConnection,
    directory: CurrencyDirectory,
    provider: Arc<dyn QuoteProvider>,
    pairs: Arc<Vec<CurrencyPair>>,
    concurrency: usize,
}

impl SyncEngine {
    pub fn new(
        db: DatabaseConnection,
        directory: CurrencyDirectory,
        provider: Arc<dyn QuoteProvider>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            db,
            directory,
            provider,
            pairs: Arc::new(build_pair_matrix(config)),
            concurrency: config.concurrency.max(1),
        }
    }

    pub fn pairs(&self) -> &[CurrencyPair] {
        &self.pairs
    }

    pub fn source_tag(&self) -> &str {
        self.provider.name()
    }

    /// Sync the window ending today (UTC).
    pub async fn run_sync(&self) -> SyncReport {
        self.run_sync_for(Utc::now().date_naive()).await
    }

    /// Sync the window ending at `today`. Never fails; see the report.
    pub async fn run_sync_for(&self, today: NaiveDate) -> SyncReport {
        let (window_start, window_end) = quote_window(today);
        let started_at = Utc::now();

        tracing::info!(
            "Starting exchange rate synchronization for {} pairs ({} to {})",
            self.pairs.len(),
            window_start,
            window_end
        );

        // `buffered` keeps report order equal to matrix order
        let pairs: Vec<PairReport> = stream::iter(self.pairs.iter().cloned())
            .map(|pair| async move {
                let outcome = self.sync_pair(&pair, window_start, window_end).await;
                PairReport {
                    base: pair.base,
                    quote: pair.quote,
                    outcome,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = SyncReport {
            window_start,
            window_end,
            started_at,
            finished_at: Utc::now(),
            pairs,
        };

        tracing::info!(
            "Exchange rate synchronization completed: {} inserted, {} pairs ok, {} failed",
            report.total_inserted(),
            report.succeeded_pairs(),
            report.failed_pairs()
        );

        report
    }

    async fn sync_pair(
        &self,
        pair: &CurrencyPair,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> PairOutcome {
        let raw = match self
            .provider
            .fetch(&pair.base, &pair.quote, window_start, window_end)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Error syncing exchange rates for {}: {}", pair, e);
                return PairOutcome::ProviderFailed {
                    reason: e.to_string(),
                };
            }
        };

        let (Some(meta), Some(data)) = (raw.meta, raw.data) else {
            tracing::warn!("Invalid API response received for {}", pair);
            return PairOutcome::NoData;
        };

        // The response's own meta decides which pair the quotes belong to
        let (base, quote) = match self.resolve_pair(&meta.base, &meta.quote).await {
            Ok(resolved) => resolved,
            Err(PairFailure::Config(reason)) => {
                tracing::error!("Error syncing exchange rates for {}: {}", pair, reason);
                return PairOutcome::ConfigError { reason };
            }
            Err(PairFailure::Store(reason)) => {
                tracing::error!("Error syncing exchange rates for {}: {}", pair, reason);
                return PairOutcome::StoreFailed { reason };
            }
        };
        let resolved_pair = CurrencyPair::new(base.code.clone(), quote.code.clone());

        let (parsed, rejected_entries) = parse_quote_data(&resolved_pair, &data);

        let mut staged = Vec::with_capacity(parsed.len());
        let mut already_present = 0;

        for point in parsed {
            match rate_store::exists_at(&self.db, base.id, quote.id, point.timestamp).await {
                Ok(true) => {
                    tracing::debug!(
                        "Exchange rate already exists for {} at {}",
                        resolved_pair,
                        point.timestamp
                    );
                    already_present += 1;
                }
                Ok(false) => staged.push(NewExchangeRate {
                    base_currency_id: base.id,
                    quote_currency_id: quote.id,
                    rate: point.rate,
                    timestamp: point.timestamp,
                    source: self.provider.name().to_string(),
                }),
                Err(e) => {
                    tracing::error!("Error checking existing rates for {}: {}", resolved_pair, e);
                    return PairOutcome::StoreFailed {
                        reason: e.to_string(),
                    };
                }
            }
        }

        let staged_count = staged.len() as u64;
        let inserted = match rate_store::insert_batch(&self.db, staged).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!("Error saving exchange rates for {}: {}", resolved_pair, e);
                return PairOutcome::StoreFailed {
                    reason: e.to_string(),
                };
            }
        };

        // Rows staged but not written were inserted by an overlapping run
        already_present += staged_count.saturating_sub(inserted);

        if inserted > 0 {
            tracing::info!("Saved {} exchange rates for {}", inserted, resolved_pair);
        }

        PairOutcome::Success {
            inserted,
            already_present,
            rejected_entries,
        }
    }

    async fn resolve_pair(
        &self,
        base_code: &str,
        quote_code: &str,
    ) -> Result<(currencies::Model, currencies::Model), PairFailure> {
        let base = self.resolve_code(base_code, "Base").await?;
        let quote = self.resolve_code(quote_code, "Quote").await?;
        Ok((base, quote))
    }

    async fn resolve_code(
        &self,
        code: &str,
        role: &str,
    ) -> Result<currencies::Model, PairFailure> {
        match self.directory.require_code(code).await {
            Ok(currency) => Ok(currency),
            Err(AppError::NotFound(_)) => Err(PairFailure::Config(format!(
                "{} currency not found: {}",
                role, code
            ))),
            Err(e) => Err(PairFailure::Store(e.to_string())),
        }
    }
}

enum PairFailure {
    Config(String),
    Store(String),
}
