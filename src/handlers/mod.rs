use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub mod currency;
pub mod exchange_rate;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/currencies", get(currency::list_currencies))
        .route("/currencies/{id}", get(currency::get_currency_by_id))
        .route("/currencies/code/{code}", get(currency::get_currency_by_code))
        .route(
            "/exchange-rates",
            get(exchange_rate::get_exchange_rates).post(exchange_rate::create_exchange_rate),
        )
        .route("/exchange-rates/latest", get(exchange_rate::get_latest_exchange_rate))
        .route("/exchange-rates/sync", post(exchange_rate::sync_exchange_rates))
        .with_state(state)
}
