use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::AppState;
use crate::config::is_iso_code;
use crate::error::{AppError, AppResult};
use crate::models::exchange_rate::{
    CreateExchangeRateRequest, ExchangeRateResponse, LatestRateQuery, RateRangeQuery,
};
use crate::models::response::ApiResponse;
use crate::models::sync::SyncReport;
use crate::services::rate_store::{self, MANUAL_SOURCE, NewExchangeRate, RATE_SCALE, RateBoundsError};
use crate::services::sync_status::{self, EXCHANGE_RATE_SYNC_JOB};

const MAX_SOURCE_LEN: usize = 50;

pub async fn get_exchange_rates(
    State(state): State<AppState>,
    query: Result<Query<RateRangeQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<ExchangeRateResponse>>>> {
    let Query(params) = query?;
    tracing::info!(
        "GET /exchange-rates - base={}, quote={}, startDate={}, endDate={}",
        params.base_code,
        params.quote_code,
        params.start_date,
        params.end_date
    );

    if params.start_date > params.end_date {
        return Err(AppError::validation(
            "startDate",
            "startDate must not be after endDate",
        ));
    }

    let base = state.directory.require_code(&params.base_code).await?;
    let quote = state.directory.require_code(&params.quote_code).await?;

    let (start, end) = rate_store::day_bounds(params.start_date, params.end_date);
    let rates = rate_store::find_range(&state.db, base.id, quote.id, start, end)
        .await?
        .into_iter()
        .map(|rate| ExchangeRateResponse::from_model(rate, &base, &quote))
        .collect();

    Ok(Json(ApiResponse::success(rates)))
}

pub async fn get_latest_exchange_rate(
    State(state): State<AppState>,
    query: Result<Query<LatestRateQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<ExchangeRateResponse>>> {
    let Query(params) = query?;
    tracing::info!(
        "GET /exchange-rates/latest - base={}, quote={}",
        params.base_code,
        params.quote_code
    );

    let base = state.directory.require_code(&params.base_code).await?;
    let quote = state.directory.require_code(&params.quote_code).await?;

    let rate = rate_store::find_latest(&state.db, base.id, quote.id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound(format!(
                "Exchange rate not found for base={} and quote={}",
                base.code, quote.code
            )),
            other => other,
        })?;

    Ok(Json(ApiResponse::success(ExchangeRateResponse::from_model(
        rate, &base, &quote,
    ))))
}

pub async fn create_exchange_rate(
    State(state): State<AppState>,
    body: Result<Json<CreateExchangeRateRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<ExchangeRateResponse>>)> {
    let Json(request) = body?;
    tracing::info!(
        "POST /exchange-rates - Creating exchange rate {}/{} at {}",
        request.base_currency_code,
        request.quote_currency_code,
        request.timestamp
    );

    validate_create_request(&request)?;

    let base = state.directory.require_code(&request.base_currency_code).await?;
    let quote = state.directory.require_code(&request.quote_currency_code).await?;

    let source = request
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(MANUAL_SOURCE)
        .to_string();

    let created = rate_store::insert_one(
        &state.db,
        NewExchangeRate {
            base_currency_id: base.id,
            quote_currency_id: quote.id,
            rate: request.rate,
            timestamp: request.timestamp,
            source,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            "Exchange rate created successfully",
            ExchangeRateResponse::from_model(created, &base, &quote),
        )),
    ))
}

/// Run a sync right away and return the per-pair report.
pub async fn sync_exchange_rates(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<SyncReport>>> {
    tracing::info!("POST /exchange-rates/sync - Syncing exchange rates");

    let report = state.sync.run_sync().await;

    if let Err(e) = sync_status::record_run(
        &state.db,
        EXCHANGE_RATE_SYNC_JOB,
        &report,
        state.sync_interval_secs,
    )
    .await
    {
        tracing::warn!("Failed to record manual sync run: {}", e);
    }

    Ok(Json(ApiResponse::success_with_message(
        "Exchange rates synchronization completed",
        report,
    )))
}

pub fn validate_create_request(request: &CreateExchangeRateRequest) -> AppResult<()> {
    if !is_iso_code(&request.base_currency_code) {
        return Err(AppError::validation(
            "baseCurrencyCode",
            "Currency code must be 3 uppercase letters",
        ));
    }
    if !is_iso_code(&request.quote_currency_code) {
        return Err(AppError::validation(
            "quoteCurrencyCode",
            "Currency code must be 3 uppercase letters",
        ));
    }
    if request.base_currency_code == request.quote_currency_code {
        return Err(AppError::validation(
            "quoteCurrencyCode",
            "Quote currency must differ from base currency",
        ));
    }
    if request.rate <= Decimal::ZERO {
        return Err(AppError::validation(
            "rate",
            RateBoundsError::NotPositive.to_string(),
        ));
    }
    if request.rate.normalize().scale() > RATE_SCALE {
        return Err(AppError::validation(
            "rate",
            format!("Rate must have at most {} decimal places", RATE_SCALE),
        ));
    }
    rate_store::check_rate_bounds(request.rate)
        .map_err(|e| AppError::validation("rate", e.to_string()))?;
    if let Some(source) = &request.source {
        if source.len() > MAX_SOURCE_LEN {
            return Err(AppError::validation(
                "source",
                format!("Source must be at most {} characters", MAX_SOURCE_LEN),
            ));
        }
    }
    Ok(())
}
