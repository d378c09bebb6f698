pub mod exchange_rate_sync;
