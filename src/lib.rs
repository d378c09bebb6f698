// src/lib.rs

use sea_orm::DatabaseConnection;
use services::{currency_directory::CurrencyDirectory, sync_engine::SyncEngine};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub directory: CurrencyDirectory,
    pub sync: SyncEngine,
    /// Minimum gap recorded for the sync job, in seconds
    pub sync_interval_secs: i32,
}

pub mod entities {
    pub mod prelude;
    pub mod currencies;
    pub mod exchange_rates;
    pub mod sync_status;
}

pub mod services {
    pub mod currency_directory;
    pub mod quote_provider;
    pub mod rate_store;
    pub mod sync_engine;
    pub mod sync_status;
}

pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
