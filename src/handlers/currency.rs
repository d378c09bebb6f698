use axum::{
    Json,
    extract::{Path, State},
};

use crate::AppState;
use crate::error::AppResult;
use crate::models::currency::CurrencyResponse;
use crate::models::response::ApiResponse;

pub async fn list_currencies(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<CurrencyResponse>>>> {
    tracing::info!("GET /currencies - Retrieving all currencies");

    let currencies = state
        .directory
        .list_all()
        .await?
        .into_iter()
        .map(CurrencyResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(currencies)))
}

pub async fn get_currency_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<CurrencyResponse>>> {
    tracing::info!("GET /currencies/{} - Retrieving currency by ID", id);

    let currency = state.directory.find_by_id(id).await?;
    Ok(Json(ApiResponse::success(currency.into())))
}

pub async fn get_currency_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<CurrencyResponse>>> {
    tracing::info!("GET /currencies/code/{} - Retrieving currency by code", code);

    let currency = state.directory.require_code(&code).await?;
    Ok(Json(ApiResponse::success(currency.into())))
}
