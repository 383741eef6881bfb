use std::time::Instant;

use serde_json::json;
use tidecast_core::csv_codec::{write_document, DEFAULT_DELIMITER};
use tidecast_core::exog::{exog_template, import_exog};
use tidecast_core::{CacheMode, ExogMap, ForecastClient};

use crate::cli::TemplateArgs;
use crate::error::CliError;

use super::{read_csv, CommandResult};

pub async fn run(
    args: &TemplateArgs,
    client: Option<&ForecastClient>,
    mode: CacheMode,
) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let mut warnings = Vec::new();
    let mut cache_hit = false;

    let columns = match (&args.columns, client) {
        (Some(columns), _) => columns
            .iter()
            .map(|column| column.trim().to_owned())
            .filter(|column| !column.is_empty())
            .collect::<Vec<_>>(),
        (None, Some(client)) => {
            let meta = client.meta(mode).await?;
            cache_hit = meta.cache_hit;
            meta.data.expected_exog_used_by_forecast
        }
        (None, None) => {
            return Err(CliError::Command(String::from(
                "template needs --columns or a reachable forecast service",
            )))
        }
    };
    if columns.is_empty() {
        warnings.push(String::from("no exogenous columns; the template has no columns"));
    }

    let prefill = match &args.exog_csv {
        Some(path) => {
            let (map, report) = import_exog(&read_csv(path)?, &columns, args.horizon);
            warnings.extend(report.warnings());
            map
        }
        None => ExogMap::new(),
    };

    let document = exog_template(&prefill, &columns, args.horizon);
    let text = write_document(&document, DEFAULT_DELIMITER);

    let data = match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))?;
            json!({
                "path": path.display().to_string(),
                "columns": document.headers,
                "rows": document.rows.len(),
            })
        }
        None => serde_json::to_value(&document)?,
    };

    Ok(CommandResult::ok(data)
        .with_csv(text)
        .with_warnings(warnings)
        .with_latency(started.elapsed().as_millis() as u64)
        .with_cache_hit(cache_hit))
}
