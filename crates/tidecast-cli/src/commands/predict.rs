use std::time::Instant;

use tidecast_core::csv_codec::{serialize, DEFAULT_DELIMITER};
use tidecast_core::exog::{format_decimal, import_exog, map_to_matrix_with_report, resize_map};
use tidecast_core::request::DEFAULT_HORIZON;
use tidecast_core::{
    apply_defaults, CacheMode, CsvRecord, ExogPayload, ForecastClient, ForecastPoint,
    RequestDraft,
};

use crate::cli::PredictArgs;
use crate::error::CliError;

use super::{read_csv, CommandResult};

pub async fn run(
    args: &PredictArgs,
    client: &ForecastClient,
    mode: CacheMode,
) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let mut warnings = Vec::new();
    let mut cache_hit = true;

    let mut draft = build_draft(args)?;

    let mut columns = None;
    if let Some(path) = &args.exog_csv {
        let meta = client.meta(mode).await?;
        cache_hit &= meta.cache_hit;
        let declared = meta.data.expected_exog_used_by_forecast;

        let document = read_csv(path)?;
        let horizon = draft.horizon.unwrap_or(DEFAULT_HORIZON);
        let (map, report) = import_exog(&document, &declared, horizon);
        warnings.extend(report.warnings());

        draft = draft.with_exog_map(map);
        columns = Some(declared);
    } else if matches!(draft.exog, Some(ExogPayload::Map(_))) {
        let meta = client.meta(mode).await?;
        cache_hit &= meta.cache_hit;
        let declared = meta.data.expected_exog_used_by_forecast;

        let (resized, repairs) = resize_draft_map(draft, &declared);
        warnings.extend(repairs);
        draft = resized;
        columns = Some(declared);
    }

    let mut body = apply_defaults(draft);
    if let (true, Some(columns)) = (args.matrix, &columns) {
        let (converted, report) = body.into_matrix(columns);
        if let Some(report) = report {
            warnings.extend(report.warnings());
        }
        body = converted;
    }

    let fetched = client.predict(&body, mode).await?;
    cache_hit &= fetched.cache_hit;
    let response = fetched.data;
    warnings.extend(response.warnings.iter().cloned());

    Ok(CommandResult::ok(serde_json::to_value(&response)?)
        .with_csv(forecast_csv(&response.forecasts))
        .with_warnings(warnings)
        .with_latency(started.elapsed().as_millis() as u64)
        .with_cache_hit(cache_hit))
}

fn build_draft(args: &PredictArgs) -> Result<RequestDraft, CliError> {
    let mut draft = match &args.draft {
        Some(path) => serde_json::from_str::<RequestDraft>(&std::fs::read_to_string(path)?)?,
        None => RequestDraft::new(),
    };

    if let Some(horizon) = args.horizon {
        draft = draft.with_horizon(horizon);
    }
    if let Some(frequency) = &args.frequency {
        draft = draft.with_frequency(frequency.clone());
    }
    if let Some(alpha) = args.alpha {
        draft = draft.with_alpha(alpha);
    }
    if let Some(strategy) = args.strategy {
        draft = draft.with_strategy(strategy);
    }
    if args.no_clip {
        draft = draft.with_clip_non_negative(false);
    }
    if let Some(floor) = args.floor {
        draft = draft.with_floor(floor);
    }
    Ok(draft)
}

/// Sizes a map payload to the declared columns and the draft's horizon.
/// Drafts without a map payload are returned untouched.
fn resize_draft_map(draft: RequestDraft, declared: &[String]) -> (RequestDraft, Vec<String>) {
    let horizon = draft.horizon.unwrap_or(DEFAULT_HORIZON);
    let Some(ExogPayload::Map(map)) = &draft.exog else {
        return (draft, Vec::new());
    };

    let (_, report) = map_to_matrix_with_report(map, declared, horizon);
    let resized = resize_map(map, declared, horizon);
    (draft.with_exog_map(resized), report.warnings())
}

/// Forecast export with columns `ds,yhat,yhat_lower,yhat_upper`.
fn forecast_csv(points: &[ForecastPoint]) -> String {
    let optional = |value: Option<f64>| value.map(format_decimal).unwrap_or_default();
    let records = points
        .iter()
        .map(|point| {
            CsvRecord::new()
                .with("ds", point.ds.as_str())
                .with("yhat", format_decimal(point.yhat))
                .with("yhat_lower", optional(point.yhat_lower))
                .with("yhat_upper", optional(point.yhat_upper))
        })
        .collect::<Vec<_>>();
    serialize(&records, DEFAULT_DELIMITER)
}
