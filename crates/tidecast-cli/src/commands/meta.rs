use std::time::Instant;

use tidecast_core::csv_codec::{serialize, DEFAULT_DELIMITER};
use tidecast_core::{CacheMode, CsvRecord, ForecastClient};

use crate::error::CliError;

use super::CommandResult;

pub async fn run(client: &ForecastClient, mode: CacheMode) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let fetched = client.meta(mode).await?;
    let latency_ms = started.elapsed().as_millis() as u64;

    let mut warnings = Vec::new();
    if fetched.data.columns().is_empty() {
        warnings.push(String::from(
            "the model declares no exogenous columns; manual drivers will be ignored",
        ));
    }

    let records = fetched
        .data
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            CsvRecord::new()
                .with("position", index.to_string())
                .with("column", column.as_str())
        })
        .collect::<Vec<_>>();

    Ok(CommandResult::ok(serde_json::to_value(&fetched.data)?)
        .with_csv(serialize(&records, DEFAULT_DELIMITER))
        .with_warnings(warnings)
        .with_latency(latency_ms)
        .with_cache_hit(fetched.cache_hit))
}
