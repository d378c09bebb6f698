//! `SeaORM` Entity prelude

pub use super::currencies::Entity as Currencies;
pub use super::exchange_rates::Entity as ExchangeRates;
pub use super::sync_status::Entity as SyncStatus;
