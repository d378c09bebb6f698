#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use fx_rates_backend::{
    AppState,
    config::SyncConfig,
    services::{
        currency_directory::CurrencyDirectory,
        quote_provider::{
            ProviderError, QuoteEntry, QuoteMeta, QuotePrice, QuoteProvider, RawQuote,
        },
        sync_engine::SyncEngine,
    },
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

pub const PROVIDER_NAME: &str = "OANDA";

/// Fresh in-memory database with all migrations (and seed currencies) applied.
pub async fn setup_test_db() -> DatabaseConnection {
    // A single pooled connection keeps the in-memory database alive and shared
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");

    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Build a chart response from `(date, close)` points.
///
/// Repeating a date adds another entry to that date's bucket, in order.
pub fn chart(base: &str, quote: &str, points: &[(&str, &str)]) -> RawQuote {
    let mut data: BTreeMap<String, Vec<QuoteEntry>> = BTreeMap::new();
    for (date, close) in points {
        data.entry(date.to_string()).or_default().push(QuoteEntry {
            date: Some(Value::String(date.to_string())),
            close: Some(QuotePrice::text(*close)),
            ..Default::default()
        });
    }

    RawQuote {
        meta: Some(QuoteMeta {
            base: base.to_string(),
            quote: quote.to_string(),
            data_type: Some("chart".to_string()),
            start_date: None,
            end_date: None,
        }),
        data: Some(data),
    }
}

#[derive(Clone)]
pub enum Scripted {
    Quote(RawQuote),
    Fail { status: u16 },
}

/// Quote provider answering from a fixed script and recording every call.
///
/// Pairs without a script get an empty (but well-formed) response.
pub struct ScriptedQuoteProvider {
    script: Mutex<HashMap<(String, String), Scripted>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedQuoteProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, base: &str, quote: &str, response: Scripted) {
        self.script
            .lock()
            .unwrap()
            .insert((base.to_string(), quote.to_string()), response);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteProvider for ScriptedQuoteProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch(
        &self,
        base: &str,
        quote: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<RawQuote, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((base.to_string(), quote.to_string()));

        // Yield so overlapping runs interleave
        tokio::task::yield_now().await;

        let scripted = self
            .script
            .lock()
            .unwrap()
            .get(&(base.to_string(), quote.to_string()))
            .cloned();

        match scripted {
            Some(Scripted::Quote(raw)) => Ok(raw),
            Some(Scripted::Fail { status }) => Err(ProviderError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            None => Ok(chart(base, quote, &[])),
        }
    }
}

pub fn sync_config(bases: &[&str], quotes: &[&str]) -> SyncConfig {
    SyncConfig {
        base_currencies: bases.iter().map(|c| c.to_string()).collect(),
        quote_currencies: quotes.iter().map(|c| c.to_string()).collect(),
        concurrency: 1,
    }
}

pub fn build_engine(
    db: &DatabaseConnection,
    provider: Arc<ScriptedQuoteProvider>,
    config: &SyncConfig,
) -> SyncEngine {
    SyncEngine::new(db.clone(), CurrencyDirectory::new(db.clone()), provider, config)
}

pub fn build_state(db: &DatabaseConnection, provider: Arc<ScriptedQuoteProvider>, config: &SyncConfig) -> AppState {
    let directory = CurrencyDirectory::new(db.clone());
    AppState {
        db: db.clone(),
        directory: directory.clone(),
        sync: SyncEngine::new(db.clone(), directory, provider, config),
        sync_interval_secs: 3600,
    }
}
