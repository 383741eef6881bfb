use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::RawNumeric;

/// Discovery payload describing which exogenous drivers the model uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExogMeta {
    /// Authoritative column order for every exogenous matrix sent upstream.
    #[serde(default)]
    pub expected_exog_used_by_forecast: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<String>,
}

impl ExogMeta {
    pub fn columns(&self) -> &[String] {
        &self.expected_exog_used_by_forecast
    }
}

/// Forecast point exactly as the service sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastPointRaw {
    #[serde(default, alias = "timestamp", alias = "date")]
    pub ds: String,
    #[serde(default, alias = "forecast")]
    pub yhat: RawNumeric,
    #[serde(default, alias = "lower")]
    pub yhat_lower: RawNumeric,
    #[serde(default, alias = "upper")]
    pub yhat_upper: RawNumeric,
}

/// Forecast point with guaranteed numeric fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: String,
    pub yhat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yhat_lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yhat_upper: Option<f64>,
}

/// Predict response as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponseRaw {
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub horizon: RawNumeric,
    #[serde(default)]
    pub freq: String,
    #[serde(default)]
    pub exog_mode: String,
    #[serde(default)]
    pub exog_summary: Option<Value>,
    #[serde(default)]
    pub forecasts: Vec<ForecastPointRaw>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

/// Predict response ready for charts and tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub model_name: String,
    pub generated_at: String,
    pub horizon: usize,
    pub freq: String,
    pub exog_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exog_summary: Option<Value>,
    pub forecasts: Vec<ForecastPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
