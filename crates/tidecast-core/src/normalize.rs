//! Forecast and metrics normalization.
//!
//! Every function here is total: bad numerics become `0` (required fields)
//! or `None` (optional fields), and output lengths always match input
//! lengths.

use crate::coerce::{to_number_optional, to_number_required};
use crate::domain::{
    ForecastPoint, ForecastPointRaw, ForecastResponse, ForecastResponseRaw, MetricsResponse,
    MetricsResponseRaw, MetricsRow, MetricsRowRaw, MetricsSummary, MetricsSummaryRaw,
};

/// Maps raw forecast points 1:1 into normalized points.
pub fn normalize(raw: &[ForecastPointRaw]) -> Vec<ForecastPoint> {
    raw.iter().map(normalize_point).collect()
}

fn normalize_point(point: &ForecastPointRaw) -> ForecastPoint {
    ForecastPoint {
        ds: point.ds.clone(),
        yhat: to_number_required(&point.yhat, 0.0),
        yhat_lower: to_number_optional(&point.yhat_lower),
        yhat_upper: to_number_optional(&point.yhat_upper),
    }
}

pub fn normalize_response(raw: ForecastResponseRaw) -> ForecastResponse {
    let forecasts = normalize(&raw.forecasts);
    let horizon = to_number_optional(&raw.horizon)
        .filter(|value| *value >= 0.0)
        .map(|value| value.round() as usize)
        .unwrap_or(forecasts.len());

    ForecastResponse {
        model_name: raw.model_name,
        generated_at: raw.generated_at,
        horizon,
        freq: raw.freq,
        exog_mode: raw.exog_mode,
        exog_summary: raw.exog_summary,
        forecasts,
        warnings: raw.warnings.unwrap_or_default(),
    }
}

pub fn normalize_metrics(raw: MetricsResponseRaw) -> MetricsResponse {
    MetricsResponse {
        eval_window: raw.eval_window.unwrap_or_default(),
        metrics: raw.metrics.as_ref().map(normalize_summary),
        by_period: raw.by_period.iter().map(normalize_row).collect(),
        exog_info: raw.exog_info,
        warnings: raw.warnings.unwrap_or_default(),
    }
}

fn normalize_summary(raw: &MetricsSummaryRaw) -> MetricsSummary {
    MetricsSummary {
        mae: to_number_optional(&raw.mae),
        rmse: to_number_optional(&raw.rmse),
        mape: to_number_optional(&raw.mape),
        smape: to_number_optional(&raw.smape),
        bias: to_number_optional(&raw.bias),
        coverage: to_number_optional(&raw.coverage),
        n: to_number_optional(&raw.n)
            .filter(|value| *value >= 0.0)
            .map(|value| value.round() as u64),
    }
}

fn normalize_row(raw: &MetricsRowRaw) -> MetricsRow {
    let actual = to_number_optional(&raw.actual);
    let predicted = to_number_optional(&raw.predicted);

    // A residual sent by the server wins over the derived one.
    let residual = to_number_optional(&raw.residual).or(match (actual, predicted) {
        (Some(actual), Some(predicted)) => Some(actual - predicted).filter(|r| r.is_finite()),
        _ => None,
    });
    let abs_error = to_number_optional(&raw.abs_error)
        .map(f64::abs)
        .or(residual.map(f64::abs));

    MetricsRow {
        ds: raw.ds.clone(),
        actual,
        predicted,
        lower: to_number_optional(&raw.lower),
        upper: to_number_optional(&raw.upper),
        residual,
        abs_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::RawNumeric;

    fn raw_point(ds: &str, yhat: RawNumeric) -> ForecastPointRaw {
        ForecastPointRaw {
            ds: ds.to_owned(),
            yhat,
            ..ForecastPointRaw::default()
        }
    }

    #[test]
    fn preserves_length_and_order() {
        let raw = vec![
            raw_point("2024-01-01", RawNumeric::from("10.5")),
            raw_point("2024-01-02", RawNumeric::Missing),
            raw_point("2024-01-03", RawNumeric::from("garbage")),
            raw_point("2024-01-04", RawNumeric::Number(4.0)),
        ];

        let normalized = normalize(&raw);

        assert_eq!(normalized.len(), raw.len());
        let days: Vec<_> = normalized.iter().map(|p| p.ds.as_str()).collect();
        assert_eq!(
            days,
            ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"]
        );
        let values: Vec<_> = normalized.iter().map(|p| p.yhat).collect();
        assert_eq!(values, [10.5, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn bad_bounds_become_absent() {
        let raw = ForecastPointRaw {
            ds: String::from("2024-01-01"),
            yhat: RawNumeric::Number(5.0),
            yhat_lower: RawNumeric::from("NaN"),
            yhat_upper: RawNumeric::from("7.25"),
        };

        let point = &normalize(&[raw])[0];
        assert_eq!(point.yhat_lower, None);
        assert_eq!(point.yhat_upper, Some(7.25));
    }

    #[test]
    fn response_horizon_falls_back_to_point_count() {
        let raw: ForecastResponseRaw = serde_json::from_str(
            r#"{
                "model_name": "sarimax",
                "generated_at": "2024-01-01T00:00:00Z",
                "horizon": "garbage",
                "freq": "D",
                "exog_mode": "auto",
                "forecasts": [
                    {"ds": "2024-01-02", "yhat": "1.5", "yhat_lower": null},
                    {"ds": "2024-01-03", "yhat": 2}
                ]
            }"#,
        )
        .expect("valid payload");

        let response = normalize_response(raw);
        assert_eq!(response.horizon, 2);
        assert_eq!(response.forecasts[0].yhat, 1.5);
        assert!(response.warnings.is_empty());
    }

    #[test]
    fn metrics_rows_derive_residuals() {
        let raw: MetricsResponseRaw = serde_json::from_str(
            r#"{
                "eval_window": {"start": "2024-01-01", "end": "2024-01-31"},
                "metrics": {"mae": "1.5", "rmse": 2.0, "n": 3},
                "by_period": [
                    {"ds": "2024-01-01", "actual": 10, "predicted": "8"},
                    {"ds": "2024-01-02", "y": 5, "yhat": 7},
                    {"ds": "2024-01-03", "actual": null, "predicted": 7},
                    {"ds": "2024-01-04", "residual": "-0.5"}
                ]
            }"#,
        )
        .expect("valid payload");

        let metrics = normalize_metrics(raw);

        let summary = metrics.metrics.as_ref().expect("summary present");
        assert_eq!(summary.mae, Some(1.5));
        assert_eq!(summary.mape, None);
        assert_eq!(summary.n, Some(3));
        assert_eq!(metrics.residuals(), [2.0, -2.0, -0.5]);
        assert_eq!(metrics.absolute_errors(), [2.0, 2.0, 0.5]);
        assert_eq!(metrics.by_period[2].residual, None);
    }

    #[test]
    fn null_summary_stays_absent() {
        let raw: MetricsResponseRaw =
            serde_json::from_str(r#"{"eval_window": null, "metrics": null, "by_period": []}"#)
                .expect("valid payload");

        let metrics = normalize_metrics(raw);
        assert!(metrics.metrics.is_none());
        assert_eq!(metrics.eval_window.start, None);
    }
}
