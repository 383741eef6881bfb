use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::RawNumeric;

/// Evaluation window echoed back by the metrics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Accuracy summary as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummaryRaw {
    #[serde(default)]
    pub mae: RawNumeric,
    #[serde(default)]
    pub rmse: RawNumeric,
    #[serde(default)]
    pub mape: RawNumeric,
    #[serde(default)]
    pub smape: RawNumeric,
    #[serde(default)]
    pub bias: RawNumeric,
    #[serde(default)]
    pub coverage: RawNumeric,
    #[serde(default)]
    pub n: RawNumeric,
}

/// One evaluated period as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRowRaw {
    #[serde(default, alias = "timestamp", alias = "date")]
    pub ds: String,
    #[serde(default, alias = "y")]
    pub actual: RawNumeric,
    #[serde(default, alias = "yhat")]
    pub predicted: RawNumeric,
    #[serde(default, alias = "yhat_lower")]
    pub lower: RawNumeric,
    #[serde(default, alias = "yhat_upper")]
    pub upper: RawNumeric,
    #[serde(default)]
    pub residual: RawNumeric,
    #[serde(default)]
    pub abs_error: RawNumeric,
}

/// Metrics response as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponseRaw {
    #[serde(default)]
    pub eval_window: Option<EvalWindow>,
    #[serde(default)]
    pub metrics: Option<MetricsSummaryRaw>,
    #[serde(default)]
    pub by_period: Vec<MetricsRowRaw>,
    #[serde(default)]
    pub exog_info: Option<Value>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    pub mape: Option<f64>,
    pub smape: Option<f64>,
    pub bias: Option<f64>,
    pub coverage: Option<f64>,
    pub n: Option<u64>,
}

/// Evaluated period with residuals filled in where derivable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub ds: String,
    pub actual: Option<f64>,
    pub predicted: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
    pub residual: Option<f64>,
    pub abs_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub eval_window: EvalWindow,
    pub metrics: Option<MetricsSummary>,
    pub by_period: Vec<MetricsRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exog_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl MetricsResponse {
    /// Actual minus predicted for every period where it is known.
    pub fn residuals(&self) -> Vec<f64> {
        self.by_period.iter().filter_map(|row| row.residual).collect()
    }

    pub fn absolute_errors(&self) -> Vec<f64> {
        self.by_period.iter().filter_map(|row| row.abs_error).collect()
    }
}
