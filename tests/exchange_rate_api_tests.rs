mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use fx_rates_backend::handlers;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use crate::common::{Scripted, ScriptedQuoteProvider, chart, setup_test_db, sync_config};

async fn build_test_router(provider: Arc<ScriptedQuoteProvider>) -> Router {
    let db = setup_test_db().await;
    let state = common::build_state(&db, provider, &sync_config(&["USD"], &["EUR", "JPY"]));
    handlers::router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn manual_rate(rate: &str, timestamp: &str) -> Value {
    json!({
        "baseCurrencyCode": "USD",
        "quoteCurrencyCode": "EUR",
        "rate": rate,
        "timestamp": timestamp,
    })
}

#[tokio::test]
async fn test_list_currencies() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(&app, get("/currencies")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let codes: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["EUR", "GBP", "JPY", "USD"]);
}

#[tokio::test]
async fn test_currency_by_code_and_id() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(&app, get("/currencies/code/usd")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["code"], "USD");
    assert_eq!(json["data"]["name"], "US Dollar");

    let id = json["data"]["id"].as_i64().unwrap();
    let (status, json) = send(&app, get(&format!("/currencies/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["code"], "USD");
}

#[tokio::test]
async fn test_unknown_currency_is_not_found() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(&app, get("/currencies/code/CHF")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(json["error"]["message"], "Currency not found with code: CHF");
}

#[tokio::test]
async fn test_manual_rate_then_range_and_latest() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(
        &app,
        post_json("/exchange-rates", manual_rate("0.912345", "2024-01-01T12:00:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["rate"], "0.912345");
    assert_eq!(json["data"]["source"], "MANUAL");

    send(
        &app,
        post_json("/exchange-rates", manual_rate("0.915", "2024-01-02T12:00:00")),
    )
    .await;

    let (status, json) = send(
        &app,
        get("/exchange-rates?baseCode=USD&quoteCode=EUR&startDate=2024-01-01&endDate=2024-01-02"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rates = json["data"].as_array().unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0]["timestamp"], "2024-01-01T12:00:00");
    assert_eq!(rates[0]["baseCurrencyCode"], "USD");
    assert_eq!(rates[1]["timestamp"], "2024-01-02T12:00:00");

    let (status, json) = send(&app, get("/exchange-rates/latest?baseCode=USD&quoteCode=EUR")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["timestamp"], "2024-01-02T12:00:00");
}

#[tokio::test]
async fn test_duplicate_manual_rate_is_conflict() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;
    let body = manual_rate("0.912345", "2024-01-01T12:00:00");

    let (status, _) = send(&app, post_json("/exchange-rates", body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&app, post_json("/exchange-rates", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_invalid_manual_rate_names_field() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(
        &app,
        post_json("/exchange-rates", manual_rate("-1", "2024-01-01T12:00:00")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["field"], "rate");
}

#[tokio::test]
async fn test_range_with_inverted_dates_is_rejected() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(
        &app,
        get("/exchange-rates?baseCode=USD&quoteCode=EUR&startDate=2024-01-05&endDate=2024-01-01"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["field"], "startDate");
}

#[tokio::test]
async fn test_latest_without_rates_is_not_found() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(&app, get("/exchange-rates/latest?baseCode=USD&quoteCode=JPY")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json["error"]["message"],
        "Exchange rate not found for base=USD and quote=JPY"
    );
}

#[tokio::test]
async fn test_sync_endpoint_returns_report() {
    let provider = Arc::new(ScriptedQuoteProvider::new());
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    provider.respond(
        "USD",
        "EUR",
        Scripted::Quote(chart("USD", "EUR", &[(today.as_str(), "0.912345")])),
    );
    provider.respond("USD", "JPY", Scripted::Fail { status: 500 });
    let app = build_test_router(provider).await;

    let (status, json) = send(&app, post_json("/exchange-rates/sync", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    let pairs = json["data"]["pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0]["quote"], "EUR");
    assert_eq!(pairs[0]["status"], "success");
    assert_eq!(pairs[0]["inserted"], 1);
    assert_eq!(pairs[1]["quote"], "JPY");
    assert_eq!(pairs[1]["status"], "provider_failed");
}

#[tokio::test]
async fn test_missing_query_parameter_uses_envelope() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(&app, get("/exchange-rates?baseCode=USD&quoteCode=EUR")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["field"], "startDate");
}

#[tokio::test]
async fn test_malformed_date_uses_envelope() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(
        &app,
        get("/exchange-rates?baseCode=USD&quoteCode=EUR&startDate=2024-13-01&endDate=2024-01-02"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["field"], "startDate");
}

#[tokio::test]
async fn test_latest_without_codes_uses_envelope() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(&app, get("/exchange-rates/latest?baseCode=USD")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["field"], "quoteCode");
}

#[tokio::test]
async fn test_malformed_body_uses_envelope() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(
        &app,
        post_json(
            "/exchange-rates",
            json!({
                "baseCurrencyCode": "USD",
                "quoteCurrencyCode": "EUR",
                "timestamp": "2024-01-01T12:00:00",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["field"], "rate");

    let request = Request::builder()
        .method("POST")
        .uri("/exchange-rates")
        .body(Body::from("not json"))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["field"], "body");
}

#[tokio::test]
async fn test_oversized_manual_rate_is_rejected() {
    let app = build_test_router(Arc::new(ScriptedQuoteProvider::new())).await;

    let (status, json) = send(
        &app,
        post_json("/exchange-rates", manual_rate("12345678901234.5", "2024-01-01T12:00:00")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["field"], "rate");
}
