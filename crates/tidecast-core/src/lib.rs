//! # Tidecast Core
//!
//! Data-handling pipeline between a remote forecasting service and a
//! presentation layer.
//!
//! ## Overview
//!
//! - **Numeric coercion** of loosely typed wire numbers
//! - **Normalization** of forecast and metrics payloads
//! - **Exogenous alignment** between column maps and dense matrices
//! - **CSV codec** for exogenous templates, imports and forecast exports
//! - **Request defaults** for predict bodies
//! - **Stable keys** for response caching and in-flight dedupe
//! - **Histograms** of residuals and absolute errors
//! - **Async client** with error classification
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api_error`] | Failed-call classification and user messages |
//! | [`cache`] | TTL response cache |
//! | [`client`] | Forecast service client |
//! | [`coerce`] | Numeric coercion |
//! | [`config`] | Client configuration |
//! | [`csv_codec`] | Quote-aware CSV parse/serialize |
//! | [`domain`] | Wire and normalized data types |
//! | [`error`] | Core error types |
//! | [`exog`] | Exogenous map/matrix alignment and CSV import |
//! | [`histogram`] | Residual/error binning |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Forecast/metrics normalization |
//! | [`request`] | Predict bodies and defaults |
//! | [`stable_key`] | Order-independent hashing |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tidecast_core::{apply_defaults, CacheMode, ClientConfig, ForecastClient, ReqwestHttpClient, RequestDraft};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let http = Arc::new(ReqwestHttpClient::new(&config.user_agent));
//!     let client = ForecastClient::new(config, http);
//!
//!     let body = apply_defaults(RequestDraft::new().with_horizon(28));
//!     let forecast = client.predict(&body, CacheMode::Use).await?;
//!     for point in &forecast.data.forecasts {
//!         println!("{} {:.2}", point.ds, point.yhat);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! RequestDraft ──apply_defaults──▶ RequestBody ──▶ ForecastClient ──▶ HttpClient
//!                                      ▲                 │
//!        CSV ──parse──▶ import_exog ───┘                 ▼
//!                                        normalize_response / normalize_metrics
//!                                                        │
//!                                                        ▼
//!                                          histogram::bin, csv export
//! ```

pub mod api_error;
pub mod cache;
pub mod client;
pub mod coerce;
pub mod config;
pub mod csv_codec;
pub mod domain;
pub mod error;
pub mod exog;
pub mod histogram;
pub mod http_client;
pub mod normalize;
pub mod request;
pub mod stable_key;

pub use api_error::{extract_detail, map_status, map_transport_error, ApiError};
pub use cache::{CacheMode, CacheStore};
pub use client::{Fetched, ForecastClient, MetricsQuery};
pub use coerce::{to_number_optional, to_number_required, RawNumeric};
pub use config::ClientConfig;
pub use csv_codec::{CsvDocument, CsvRecord};
pub use domain::{
    EvalDate, EvalWindow, ExogMap, ExogMatrix, ExogMeta, ForecastPoint, ForecastPointRaw,
    ForecastResponse, ForecastResponseRaw, MetricsResponse, MetricsResponseRaw, MetricsRow,
    MetricsRowRaw, MetricsSummary, MetricsSummaryRaw,
};
pub use error::{ConfigError, CoreError, CsvParseError, ValidationError};
pub use exog::{AlignReport, ImportReport};
pub use histogram::{HistogramBin, HistogramBinner, HistogramMode};
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};
pub use normalize::{normalize, normalize_metrics, normalize_response};
pub use request::{apply_defaults, ExogMode, ExogPayload, ExogStrategy, RequestBody, RequestDraft};
