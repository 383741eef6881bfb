//! Async client for the forecast service.
//!
//! Every call goes through the same path: cache lookup, then a per-key
//! in-flight registry so identical concurrent calls share one request,
//! then the transport. Failures are mapped once into [`ApiError`] and are
//! never retried.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::api_error::{map_status, map_transport_error, ApiError};
use crate::cache::{CacheMode, CacheStore};
use crate::config::ClientConfig;
use crate::domain::{EvalDate, ExogMeta, ForecastResponse, ForecastResponseRaw, MetricsResponse, MetricsResponseRaw};
use crate::error::ValidationError;
use crate::http_client::{HttpClient, HttpMethod, HttpRequest};
use crate::normalize::{normalize_metrics, normalize_response};
use crate::request::RequestBody;
use crate::stable_key::{hash, stable_key};

pub const META_PATH: &str = "/meta";
pub const PREDICT_PATH: &str = "/predict";
pub const METRICS_PATH: &str = "/metrics";

type InFlight = Arc<OnceCell<Result<String, ApiError>>>;

/// A decoded response plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub cache_hit: bool,
}

/// Query for `GET /metrics`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsQuery {
    pub eval_start: Option<EvalDate>,
    pub eval_end: Option<EvalDate>,
    pub alpha: Option<f64>,
}

impl MetricsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses optional `yyyy-MM-dd` bounds.
    pub fn with_window(start: Option<&str>, end: Option<&str>) -> Result<Self, ValidationError> {
        let query = Self {
            eval_start: start.map(EvalDate::parse).transpose()?,
            eval_end: end.map(EvalDate::parse).transpose()?,
            alpha: None,
        };
        query.validate()?;
        Ok(query)
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(start), Some(end)) = (self.eval_start, self.eval_end) {
            if start > end {
                return Err(ValidationError::InvertedWindow {
                    start: start.format_iso(),
                    end: end.format_iso(),
                });
            }
        }
        if let Some(alpha) = self.alpha {
            if !(alpha.is_finite() && alpha > 0.0 && alpha < 1.0) {
                return Err(ValidationError::InvalidAlpha {
                    value: alpha.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Query string without the leading `?`; empty when nothing is set.
    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        if let Some(start) = self.eval_start {
            pairs.push(("eval_start", start.format_iso()));
        }
        if let Some(end) = self.eval_end {
            pairs.push(("eval_end", end.format_iso()));
        }
        if let Some(alpha) = self.alpha {
            pairs.push(("alpha", alpha.to_string()));
        }

        pairs
            .into_iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn key_value(&self) -> Value {
        json!({
            "eval_start": self.eval_start.map(EvalDate::format_iso),
            "eval_end": self.eval_end.map(EvalDate::format_iso),
            "alpha": self.alpha,
        })
    }
}

pub struct ForecastClient {
    config: ClientConfig,
    http: Arc<dyn HttpClient>,
    cache: CacheStore,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

impl ForecastClient {
    pub fn new(config: ClientConfig, http: Arc<dyn HttpClient>) -> Self {
        let cache = CacheStore::new(config.cache_ttl);
        Self {
            config,
            http,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// `GET /meta`: the declared exogenous columns.
    pub async fn meta(&self, mode: CacheMode) -> Result<Fetched<ExogMeta>, ApiError> {
        self.fetch_json(HttpMethod::Get, META_PATH, None, Value::Null, mode)
            .await
    }

    /// `POST /predict` with a validated body; the response is normalized.
    pub async fn predict(
        &self,
        body: &RequestBody,
        mode: CacheMode,
    ) -> Result<Fetched<ForecastResponse>, ApiError> {
        body.validate()?;
        let text = serde_json::to_string(body).map_err(|error| ApiError::Decode {
            message: format!("could not encode request body: {error}"),
        })?;
        let key = stable_key(body).map_err(|error| ApiError::Decode {
            message: format!("could not key request body: {error}"),
        })?;

        let fetched: Fetched<ForecastResponseRaw> = self
            .fetch_json(HttpMethod::Post, PREDICT_PATH, Some(text), Value::String(key), mode)
            .await?;
        Ok(Fetched {
            data: normalize_response(fetched.data),
            cache_hit: fetched.cache_hit,
        })
    }

    /// `GET /metrics` for an optional evaluation window.
    pub async fn metrics(
        &self,
        query: &MetricsQuery,
        mode: CacheMode,
    ) -> Result<Fetched<MetricsResponse>, ApiError> {
        query.validate()?;
        let query_string = query.to_query_string();
        let path = if query_string.is_empty() {
            METRICS_PATH.to_owned()
        } else {
            format!("{METRICS_PATH}?{query_string}")
        };

        let fetched: Fetched<MetricsResponseRaw> = self
            .fetch_json(HttpMethod::Get, &path, None, query.key_value(), mode)
            .await?;
        Ok(Fetched {
            data: normalize_metrics(fetched.data),
            cache_hit: fetched.cache_hit,
        })
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        key_source: Value,
        mode: CacheMode,
    ) -> Result<Fetched<T>, ApiError> {
        let (text, cache_hit) = self.fetch(method, path, body, &key_source, mode).await?;
        let data = serde_json::from_str(&text).map_err(|error| ApiError::Decode {
            message: error.to_string(),
        })?;
        Ok(Fetched { data, cache_hit })
    }

    async fn fetch(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        key_source: &Value,
        mode: CacheMode,
    ) -> Result<(String, bool), ApiError> {
        let key = format!("{} {} {}", method.as_str(), path, hash(key_source));

        if mode.reads() {
            if let Some(text) = self.cache.get(&key).await {
                debug!(%key, "cache hit");
                return Ok((text, true));
            }
        }

        let (cell, leader) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(&key) {
                Some(cell) => (Arc::clone(cell), false),
                None => {
                    let cell: InFlight = Arc::new(OnceCell::new());
                    in_flight.insert(key.clone(), Arc::clone(&cell));
                    (cell, true)
                }
            }
        };
        if !leader {
            debug!(%key, "joining in-flight request");
        }

        let cache_key = &key;
        let result = cell
            .get_or_init(|| async move {
                let result = self.send(method, path, body).await;
                if let (Ok(text), true) = (&result, mode.writes()) {
                    self.cache.put(cache_key.clone(), text.clone()).await;
                }
                result
            })
            .await
            .clone();

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if in_flight
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &cell))
            {
                in_flight.remove(&key);
            }
        }

        result.map(|text| (text, false))
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
    ) -> Result<String, ApiError> {
        let url = self.config.endpoint(path);
        let timeout_ms = self.config.timeout_ms;
        let request = match body {
            Some(body) => HttpRequest::post_json(&url, body),
            None => HttpRequest::new(method, &url),
        }
        .with_header("accept", "application/json")
        .with_timeout_ms(timeout_ms);

        info!(method = method.as_str(), %url, "calling forecast service");
        let started = Instant::now();
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|error| map_transport_error(&error, timeout_ms))?;
        debug!(
            status = response.status,
            latency_ms = started.elapsed().as_millis() as u64,
            "forecast service responded"
        );

        if !response.is_success() {
            return Err(map_status(response.status, &response.body));
        }
        Ok(response.body)
    }

    /// Number of keys currently awaiting a response.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
