mod histogram;
mod meta;
mod metrics;
mod predict;
mod template;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tidecast_core::csv_codec::{detect_delimiter, parse_strict};
use tidecast_core::{CacheMode, ClientConfig, CsvDocument, ForecastClient, ReqwestHttpClient};
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{Envelope, Metadata};

#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    /// Document printed by `--format csv`.
    pub csv: Option<String>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
    pub cache_hit: bool,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            csv: None,
            warnings: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
        }
    }

    pub fn with_csv(mut self, csv: String) -> Self {
        self.csv = Some(csv);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }
}

/// Rendered command output: the JSON envelope plus an optional CSV body.
pub struct CommandOutput {
    pub envelope: Envelope<Value>,
    pub csv: Option<String>,
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    let mode = if cli.no_cache {
        CacheMode::Bypass
    } else {
        CacheMode::Use
    };

    let result = match &cli.command {
        Command::Meta => meta::run(&connect(cli)?, mode).await?,
        Command::Predict(args) => predict::run(args, &connect(cli)?, mode).await?,
        Command::Metrics(args) => metrics::run(args, &connect(cli)?, mode).await?,
        Command::Template(args) => {
            let client = match args.columns {
                Some(_) => None,
                None => Some(connect(cli)?),
            };
            template::run(args, client.as_ref(), mode).await?
        }
        Command::Histogram(args) => histogram::run(args)?,
    };

    let CommandResult {
        data,
        csv,
        warnings,
        latency_ms,
        cache_hit,
    } = result;

    let mut meta = Metadata::new(latency_ms, cache_hit);
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(CommandOutput {
        envelope: Envelope { meta, data },
        csv,
    })
}

fn connect(cli: &Cli) -> Result<ForecastClient, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(api_base) = &cli.api_base {
        config = config.with_api_base(api_base.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    let config = config.validate()?;
    debug!(api_base = %config.api_base, timeout_ms = config.timeout_ms, "client configured");

    let http = Arc::new(ReqwestHttpClient::new(&config.user_agent));
    Ok(ForecastClient::new(config, http))
}

/// Reads a user-supplied CSV file, guessing the delimiter from its first line.
pub(crate) fn read_csv(path: &Path) -> Result<CsvDocument, CliError> {
    let text = std::fs::read_to_string(path)?;
    parse_strict(&text, detect_delimiter(&text)).map_err(|source| CliError::Csv {
        path: path.to_path_buf(),
        source,
    })
}
