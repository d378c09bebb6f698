pub mod currency;
pub mod exchange_rate;
pub mod response;
pub mod sync;
