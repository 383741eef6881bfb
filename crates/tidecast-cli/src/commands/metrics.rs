use std::time::Instant;

use serde::Serialize;
use tidecast_core::csv_codec::{serialize, DEFAULT_DELIMITER};
use tidecast_core::exog::format_decimal;
use tidecast_core::histogram::bin;
use tidecast_core::{
    CacheMode, CsvRecord, ForecastClient, HistogramBin, HistogramMode, MetricsQuery,
    MetricsResponse, MetricsRow,
};

use crate::cli::MetricsArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct MetricsData {
    #[serde(flatten)]
    metrics: MetricsResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    histogram: Option<HistogramData>,
}

#[derive(Debug, Serialize)]
struct HistogramData {
    mode: HistogramMode,
    bins: Vec<HistogramBin>,
}

pub async fn run(
    args: &MetricsArgs,
    client: &ForecastClient,
    mode: CacheMode,
) -> Result<CommandResult, CliError> {
    let mut query = MetricsQuery::with_window(args.eval_start.as_deref(), args.eval_end.as_deref())?;
    if let Some(alpha) = args.alpha {
        query = query.with_alpha(alpha);
    }

    let started = Instant::now();
    let fetched = client.metrics(&query, mode).await?;
    let latency_ms = started.elapsed().as_millis() as u64;
    let metrics = fetched.data;

    let mut warnings = metrics.warnings.clone();
    let histogram = args.histogram.map(|histogram_mode| {
        let values = match histogram_mode {
            HistogramMode::Residual => metrics.residuals(),
            HistogramMode::Absolute => metrics.absolute_errors(),
        };
        if values.is_empty() {
            warnings.push(String::from(
                "no evaluated periods with both actual and predicted values; histogram is empty",
            ));
        }
        HistogramData {
            mode: histogram_mode,
            bins: bin(&values, args.bins, histogram_mode),
        }
    });

    let csv = rows_csv(&metrics.by_period);
    let data = MetricsData { metrics, histogram };

    Ok(CommandResult::ok(serde_json::to_value(&data)?)
        .with_csv(csv)
        .with_warnings(warnings)
        .with_latency(latency_ms)
        .with_cache_hit(fetched.cache_hit))
}

fn rows_csv(rows: &[MetricsRow]) -> String {
    let cell = |value: Option<f64>| value.map(format_decimal).unwrap_or_default();
    let records = rows
        .iter()
        .map(|row| {
            CsvRecord::new()
                .with("ds", row.ds.as_str())
                .with("actual", cell(row.actual))
                .with("predicted", cell(row.predicted))
                .with("lower", cell(row.lower))
                .with("upper", cell(row.upper))
                .with("residual", cell(row.residual))
                .with("abs_error", cell(row.abs_error))
        })
        .collect::<Vec<_>>();
    serialize(&records, DEFAULT_DELIMITER)
}
