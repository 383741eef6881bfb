//! CLI argument definitions for Tidecast.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `meta` | Show the exogenous columns the model expects |
//! | `predict` | Request a forecast |
//! | `metrics` | Fetch backtest metrics, optionally binned |
//! | `template` | Write the exogenous CSV template |
//! | `histogram` | Bin a numeric CSV column offline |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--api-base` | `$TIDECAST_API_BASE` | Forecast service base URL |
//! | `--timeout-ms` | `$TIDECAST_TIMEOUT_MS` | Per-request timeout |
//! | `--format` | `json` | Output format (json, table, csv) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--no-cache` | `false` | Skip the response cache |
//!
//! # Examples
//!
//! ```bash
//! tidecast meta
//! tidecast predict --horizon 28 --strategy zero --pretty
//! tidecast predict --exog-csv drivers.csv --matrix --format csv > forecast.csv
//! tidecast metrics --eval-start 2024-01-01 --eval-end 2024-03-31 --histogram residual
//! tidecast template --horizon 14 --output drivers.csv
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tidecast_core::{ExogStrategy, HistogramMode};

/// Tidecast - forecast service client
#[derive(Debug, Parser)]
#[command(
    name = "tidecast",
    author,
    version,
    about = "Client for a remote time-series forecasting service",
    long_about = "Tidecast requests forecasts and backtest metrics from a forecasting service, \
aligns exogenous driver data from CSV files, and renders results as JSON, tables or CSV.\n\
\n\
Use 'tidecast <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Forecast service base URL (overrides TIDECAST_API_BASE).
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Request timeout in milliseconds (overrides TIDECAST_TIMEOUT_MS).
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Always call the service, ignoring cached responses.
    #[arg(long, global = true, default_value_t = false)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON envelope.
    Json,
    /// Human-readable summary.
    Table,
    /// Command-specific CSV document.
    Csv,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the exogenous columns the model expects, in server order.
    Meta,

    /// Request a forecast.
    ///
    /// Without --exog-csv the service picks drivers itself (auto mode).
    ///
    /// # Examples
    ///
    ///   tidecast predict
    ///   tidecast predict --horizon 30 --frequency W --alpha 0.1
    ///   tidecast predict --exog-csv drivers.csv --matrix
    Predict(PredictArgs),

    /// Fetch backtest metrics for an evaluation window.
    ///
    /// # Examples
    ///
    ///   tidecast metrics --eval-start 2024-01-01 --eval-end 2024-01-31
    ///   tidecast metrics --histogram absolute --bins 20
    Metrics(MetricsArgs),

    /// Write the exogenous CSV template for a horizon.
    Template(TemplateArgs),

    /// Bin a numeric column of a local CSV file.
    Histogram(HistogramArgs),
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// JSON file with a partial request; flags override its fields.
    #[arg(long)]
    pub draft: Option<PathBuf>,

    /// Number of periods to forecast (default 14).
    #[arg(long)]
    pub horizon: Option<usize>,

    /// Pandas-style frequency code (default D).
    #[arg(long)]
    pub frequency: Option<String>,

    /// Significance level for prediction intervals (default 0.05).
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Strategy for filling future exogenous values in auto mode.
    #[arg(long, value_parser = parse_strategy)]
    pub strategy: Option<ExogStrategy>,

    /// Allow negative forecasts.
    #[arg(long, default_value_t = false)]
    pub no_clip: bool,

    /// Lower bound applied when clipping.
    #[arg(long, allow_negative_numbers = true)]
    pub floor: Option<f64>,

    /// CSV file of exogenous drivers, one column per declared driver.
    #[arg(long)]
    pub exog_csv: Option<PathBuf>,

    /// Send drivers as a dense matrix in the server's column order.
    #[arg(long, default_value_t = false, requires = "exog_csv")]
    pub matrix: bool,
}

#[derive(Debug, Args)]
pub struct MetricsArgs {
    /// First evaluated day (yyyy-MM-dd).
    #[arg(long)]
    pub eval_start: Option<String>,

    /// Last evaluated day (yyyy-MM-dd).
    #[arg(long)]
    pub eval_end: Option<String>,

    #[arg(long)]
    pub alpha: Option<f64>,

    /// Add a histogram of residuals or absolute errors.
    #[arg(long, value_parser = parse_mode)]
    pub histogram: Option<HistogramMode>,

    /// Requested bin count, clamped to 5..=60.
    #[arg(long, default_value_t = 20)]
    pub bins: usize,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    /// Number of data rows.
    #[arg(long, default_value_t = tidecast_core::request::DEFAULT_HORIZON)]
    pub horizon: usize,

    /// Comma-separated column list; skips the call to /meta.
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Existing CSV whose values pre-fill the template.
    #[arg(long)]
    pub exog_csv: Option<PathBuf>,

    /// Write the template here instead of including it in the output.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HistogramArgs {
    /// CSV file to read.
    #[arg(long)]
    pub input: PathBuf,

    /// Column holding the values.
    #[arg(long, default_value = "residual")]
    pub column: String,

    #[arg(long, value_parser = parse_mode, default_value = "residual")]
    pub mode: HistogramMode,

    /// Requested bin count, clamped to 5..=60.
    #[arg(long, default_value_t = 20)]
    pub bins: usize,
}

fn parse_strategy(raw: &str) -> Result<ExogStrategy, String> {
    raw.parse().map_err(|error: tidecast_core::ValidationError| error.to_string())
}

fn parse_mode(raw: &str) -> Result<HistogramMode, String> {
    raw.parse().map_err(|error: tidecast_core::ValidationError| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tidecast",
            "predict",
            "--horizon",
            "7",
            "--strategy",
            "zero",
            "--floor",
            "-1.5",
            "--format",
            "csv",
            "--no-cache",
        ])
        .expect("valid arguments");

        assert_eq!(cli.format, OutputFormat::Csv);
        assert!(cli.no_cache);
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.horizon, Some(7));
        assert_eq!(args.strategy, Some(ExogStrategy::Zero));
        assert_eq!(args.floor, Some(-1.5));
    }

    #[test]
    fn matrix_requires_a_csv() {
        assert!(Cli::try_parse_from(["tidecast", "predict", "--matrix"]).is_err());
    }

    #[test]
    fn template_columns_split_on_commas() {
        let cli = Cli::try_parse_from(["tidecast", "template", "--columns", "ADR,RoomNights"])
            .expect("valid arguments");
        let Command::Template(args) = cli.command else {
            panic!("expected template");
        };
        assert_eq!(
            args.columns,
            Some(vec![String::from("ADR"), String::from("RoomNights")])
        );
        assert_eq!(args.horizon, 14);
    }

    #[test]
    fn rejects_unknown_histogram_mode() {
        assert!(Cli::try_parse_from(["tidecast", "metrics", "--histogram", "median"]).is_err());
    }
}
