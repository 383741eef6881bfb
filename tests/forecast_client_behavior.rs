//! Behavior-driven tests for the forecast service client
//!
//! A scripted in-memory transport stands in for the network so these tests
//! observe exactly which requests leave the process.

use std::time::Duration;

use tidecast_core::{
    apply_defaults, ApiError, CacheMode, ClientConfig, ForecastClient, HttpMethod, MetricsQuery,
    RequestDraft,
};
use tidecast_tests::{ok, Arc, HttpError, HttpResponse, ScriptedHttp};

const PREDICT_BODY: &str = r#"{
    "model_name": "sarimax",
    "generated_at": "2024-05-01T00:00:00Z",
    "horizon": "2",
    "freq": "D",
    "exog_mode": "auto",
    "forecasts": [
        {"ds": "2024-05-02", "yhat": "101.5", "yhat_lower": "95", "yhat_upper": null},
        {"ds": "2024-05-03", "yhat": null, "yhat_lower": "NaN", "yhat_upper": 110}
    ],
    "warnings": ["exogenous drivers extrapolated"]
}"#;

fn client(http: Arc<ScriptedHttp>) -> ForecastClient {
    let config = ClientConfig::default()
        .with_api_base("http://forecast.test/")
        .with_timeout_ms(2_500)
        .with_cache_ttl(Duration::from_secs(60))
        .validate()
        .expect("valid config");
    ForecastClient::new(config, http)
}

// =============================================================================
// Predict: request shape and normalization
// =============================================================================

#[tokio::test]
async fn when_user_predicts_with_defaults_then_auto_body_is_posted_and_response_normalized() {
    // Given: a service that answers with loosely typed numbers
    let http = ScriptedHttp::new(vec![ok(PREDICT_BODY)]);
    let client = client(Arc::clone(&http));
    let body = apply_defaults(RequestDraft::new().with_horizon(2));

    // When: the user requests a forecast
    let fetched = client
        .predict(&body, CacheMode::Use)
        .await
        .expect("predict succeeds");

    // Then: exactly one POST reached /predict with the configured timeout
    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].url, "http://forecast.test/predict");
    assert_eq!(requests[0].timeout_ms, 2_500);
    let sent: serde_json::Value =
        serde_json::from_str(requests[0].body.as_deref().expect("body")).expect("json body");
    assert_eq!(sent["flags"]["use_auto_exog"], true);
    assert_eq!(sent["horizon"], 2);

    // And: numbers are coerced, bad values fall back
    let response = fetched.data;
    assert!(!fetched.cache_hit);
    assert_eq!(response.horizon, 2);
    assert_eq!(response.forecasts[0].yhat, 101.5);
    assert_eq!(response.forecasts[0].yhat_lower, Some(95.0));
    assert_eq!(response.forecasts[0].yhat_upper, None);
    assert_eq!(response.forecasts[1].yhat, 0.0);
    assert_eq!(response.forecasts[1].yhat_lower, None);
    assert_eq!(response.warnings, ["exogenous drivers extrapolated"]);
}

#[tokio::test]
async fn when_body_is_invalid_then_nothing_is_sent() {
    let http = ScriptedHttp::new(vec![ok(PREDICT_BODY)]);
    let client = client(Arc::clone(&http));
    let body = apply_defaults(RequestDraft::new().with_horizon(0));

    let error = client
        .predict(&body, CacheMode::Use)
        .await
        .expect_err("horizon 0 is rejected");

    assert!(matches!(error, ApiError::Validation(_)));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn when_draft_grid_has_blank_and_text_cells_then_zeros_are_sent() {
    // Given: a draft file whose exogenous grid was pasted with gaps
    let http = ScriptedHttp::new(vec![ok(PREDICT_BODY)]);
    let client = client(Arc::clone(&http));
    let draft: RequestDraft = serde_json::from_str(
        r#"{"horizon": 4, "exog": {"ADR": [1, null, "3", "x"]}}"#,
    )
    .expect("loose draft parses");

    // When: the forecast is requested
    client
        .predict(&apply_defaults(draft), CacheMode::Use)
        .await
        .expect("predict succeeds");

    // Then: the unreadable cells went out as zeros
    let sent: serde_json::Value =
        serde_json::from_str(http.requests()[0].body.as_deref().expect("body")).expect("json");
    assert_eq!(sent["exog"]["ADR"], serde_json::json!([1.0, 0.0, 3.0, 0.0]));
}

#[tokio::test]
async fn when_map_columns_miss_the_horizon_then_nothing_is_sent() {
    let http = ScriptedHttp::new(vec![ok(PREDICT_BODY)]);
    let client = client(Arc::clone(&http));
    let map = [("ADR", vec![1.0, 2.0, 3.0])].into_iter().collect();
    let body = apply_defaults(RequestDraft::new().with_horizon(5).with_exog_map(map));

    let error = client
        .predict(&body, CacheMode::Use)
        .await
        .expect_err("short column is rejected");

    assert!(matches!(error, ApiError::Validation(_)));
    assert!(error.user_message().contains("ADR"));
    assert!(http.requests().is_empty());
}

// =============================================================================
// Dedupe and caching
// =============================================================================

#[tokio::test]
async fn when_identical_requests_overlap_then_one_call_is_shared() {
    // Given: a slow service
    let http = ScriptedHttp::with_delay(vec![ok(PREDICT_BODY)], Duration::from_millis(50));
    let client = client(Arc::clone(&http));
    let body = apply_defaults(RequestDraft::new().with_horizon(2));

    // When: two identical requests are issued while the first is pending,
    // with caching disabled so only dedupe can explain sharing
    let (first, second) = tokio::join!(
        client.predict(&body, CacheMode::Bypass),
        client.predict(&body, CacheMode::Bypass)
    );

    // Then: one network call served both
    assert_eq!(http.requests().len(), 1);
    assert_eq!(
        first.expect("first succeeds").data,
        second.expect("second succeeds").data
    );
    assert_eq!(client.in_flight_len(), 0);
    assert!(client.cache().is_empty().await);
}

#[tokio::test]
async fn when_requests_differ_then_each_is_sent() {
    let http = ScriptedHttp::new(vec![ok(PREDICT_BODY), ok(PREDICT_BODY)]);
    let client = client(Arc::clone(&http));

    let short = apply_defaults(RequestDraft::new().with_horizon(2));
    let long = apply_defaults(RequestDraft::new().with_horizon(3));
    let (a, b) = tokio::join!(
        client.predict(&short, CacheMode::Use),
        client.predict(&long, CacheMode::Use)
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(http.requests().len(), 2);
}

#[tokio::test]
async fn when_response_is_cached_then_repeat_call_is_served_locally() {
    let http = ScriptedHttp::new(vec![ok(PREDICT_BODY)]);
    let client = client(Arc::clone(&http));
    let body = apply_defaults(RequestDraft::new().with_horizon(2));

    let first = client.predict(&body, CacheMode::Use).await.expect("first");
    let second = client.predict(&body, CacheMode::Use).await.expect("second");

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(first.data, second.data);
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn when_refresh_is_requested_then_cache_is_skipped_but_updated() {
    let http = ScriptedHttp::new(vec![ok(PREDICT_BODY), ok(PREDICT_BODY)]);
    let client = client(Arc::clone(&http));
    let body = apply_defaults(RequestDraft::new().with_horizon(2));

    client.predict(&body, CacheMode::Use).await.expect("prime");
    let refreshed = client
        .predict(&body, CacheMode::Refresh)
        .await
        .expect("refresh");

    assert!(!refreshed.cache_hit);
    assert_eq!(http.requests().len(), 2);
    assert_eq!(client.cache().len().await, 1);
}

// =============================================================================
// Error mapping
// =============================================================================

#[tokio::test]
async fn when_server_rejects_request_then_detail_is_surfaced_and_not_cached() {
    let rejection = r#"{"detail": [{"loc": ["body", "exog"], "msg": "column ADR has 3 values, expected 14"}]}"#;
    let http = ScriptedHttp::new(vec![
        Ok(HttpResponse::new(422, rejection)),
        Ok(HttpResponse::new(422, rejection)),
    ]);
    let client = client(Arc::clone(&http));
    let body = apply_defaults(RequestDraft::new().with_horizon(2));

    let error = client
        .predict(&body, CacheMode::Use)
        .await
        .expect_err("rejected");
    assert_eq!(
        error,
        ApiError::Server {
            status: 422,
            detail: String::from("column ADR has 3 values, expected 14"),
        }
    );

    // A failed call leaves nothing behind; the retry goes to the network.
    let _ = client.predict(&body, CacheMode::Use).await;
    assert_eq!(http.requests().len(), 2);
}

#[tokio::test]
async fn when_transport_times_out_then_timeout_error_names_budget() {
    let http = ScriptedHttp::new(vec![Err(HttpError::timeout("deadline elapsed"))]);
    let client = client(http);

    let error = client.meta(CacheMode::Use).await.expect_err("times out");

    assert_eq!(error, ApiError::Timeout { timeout_ms: 2_500 });
    assert!(error.user_message().contains("2.5 s"));
}

#[tokio::test]
async fn when_service_is_unreachable_then_network_error_is_reported() {
    let http = ScriptedHttp::new(vec![Err(HttpError::connect("connection refused"))]);
    let client = client(http);

    let error = client.meta(CacheMode::Use).await.expect_err("unreachable");

    assert!(matches!(error, ApiError::Network { .. }));
}

#[tokio::test]
async fn when_body_is_not_json_then_decode_error_is_reported() {
    let http = ScriptedHttp::new(vec![ok("<html>proxy login</html>")]);
    let client = client(http);

    let error = client.meta(CacheMode::Use).await.expect_err("not json");

    assert!(matches!(error, ApiError::Decode { .. }));
}

// =============================================================================
// Meta and metrics
// =============================================================================

#[tokio::test]
async fn when_meta_is_fetched_then_declared_order_is_kept() {
    let http = ScriptedHttp::new(vec![ok(
        r#"{"expected_exog_used_by_forecast": ["RoomNights", "ADR"], "model_name": "sarimax"}"#,
    )]);
    let client = client(Arc::clone(&http));

    let meta = client.meta(CacheMode::Use).await.expect("meta");

    assert_eq!(meta.data.columns(), ["RoomNights", "ADR"]);
    assert_eq!(http.requests()[0].url, "http://forecast.test/meta");
    assert_eq!(http.requests()[0].method, HttpMethod::Get);
}

#[tokio::test]
async fn when_metrics_are_fetched_then_window_is_encoded_and_residuals_derived() {
    let http = ScriptedHttp::new(vec![ok(
        r#"{
            "eval_window": {"start": "2024-01-01", "end": "2024-01-03"},
            "metrics": {"mae": 1.0, "rmse": "1.2", "n": 2},
            "by_period": [
                {"ds": "2024-01-01", "actual": 10, "predicted": 9},
                {"ds": "2024-01-02", "actual": "8", "predicted": 9}
            ]
        }"#,
    )]);
    let client = client(Arc::clone(&http));
    let query = MetricsQuery::with_window(Some("2024-01-01"), Some("2024-01-03"))
        .expect("valid window")
        .with_alpha(0.1);

    let metrics = client.metrics(&query, CacheMode::Use).await.expect("metrics");

    assert_eq!(
        http.requests()[0].url,
        "http://forecast.test/metrics?eval_start=2024-01-01&eval_end=2024-01-03&alpha=0.1"
    );
    assert_eq!(metrics.data.residuals(), [1.0, -1.0]);
    assert_eq!(metrics.data.absolute_errors(), [1.0, 1.0]);
    assert_eq!(
        metrics.data.metrics.as_ref().and_then(|summary| summary.rmse),
        Some(1.2)
    );
}
