use serde_json::json;
use tidecast_core::coerce::{to_number_optional, RawNumeric};
use tidecast_core::csv_codec::{serialize, DEFAULT_DELIMITER};
use tidecast_core::exog::format_decimal;
use tidecast_core::histogram::{bin, HistogramBin};
use tidecast_core::CsvRecord;

use crate::cli::HistogramArgs;
use crate::error::CliError;

use super::{read_csv, CommandResult};

pub fn run(args: &HistogramArgs) -> Result<CommandResult, CliError> {
    let document = read_csv(&args.input)?;
    let cells = document.column(&args.column).ok_or_else(|| {
        CliError::Command(format!(
            "column '{}' not found; available: {}",
            args.column,
            document.headers.join(", ")
        ))
    })?;

    let values = cells
        .iter()
        .filter_map(|cell| to_number_optional(&RawNumeric::from(*cell)))
        .collect::<Vec<_>>();

    let mut warnings = Vec::new();
    let skipped = cells.len() - values.len();
    if skipped > 0 {
        warnings.push(format!(
            "skipped {skipped} empty or non-numeric cell(s) in column '{}'",
            args.column
        ));
    }

    let bins = bin(&values, args.bins, args.mode);
    let data = json!({
        "column": args.column,
        "mode": args.mode,
        "sample_size": values.len(),
        "bins": bins,
    });

    Ok(CommandResult::ok(data)
        .with_csv(bins_csv(&bins))
        .with_warnings(warnings))
}

fn bins_csv(bins: &[HistogramBin]) -> String {
    let records = bins
        .iter()
        .map(|bin| {
            CsvRecord::new()
                .with("lower_edge", format_decimal(bin.lower_edge))
                .with("upper_edge", format_decimal(bin.upper_edge))
                .with("center", format_decimal(bin.center))
                .with("count", bin.count.to_string())
        })
        .collect::<Vec<_>>();
    serialize(&records, DEFAULT_DELIMITER)
}

#[cfg(test)]
mod tests {
    use tidecast_core::HistogramMode;

    use super::*;

    #[test]
    fn bins_a_csv_column_and_counts_skipped_cells() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("residuals.csv");
        std::fs::write(
            &input,
            "ds,residual\n2024-01-01,-5\n2024-01-02,n/a\n2024-01-03,5\n2024-01-04,\n",
        )
        .expect("write");

        let result = run(&HistogramArgs {
            input,
            column: String::from("residual"),
            mode: HistogramMode::Residual,
            bins: 5,
        })
        .expect("histogram builds");

        assert_eq!(result.data["sample_size"], 2);
        assert_eq!(result.data["bins"].as_array().map(Vec::len), Some(5));
        assert_eq!(result.warnings.len(), 1);
        let csv = result.csv.expect("csv body");
        assert!(csv.starts_with("lower_edge,upper_edge,center,count\n-5,-3,-4,1\n"));
        assert!(csv.ends_with("3,5,4,1"));
    }

    #[test]
    fn unknown_column_lists_headers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("data.csv");
        std::fs::write(&input, "a,b\n1,2\n").expect("write");

        let error = run(&HistogramArgs {
            input,
            column: String::from("residual"),
            mode: HistogramMode::Absolute,
            bins: 10,
        })
        .expect_err("missing column");
        assert!(error.to_string().contains("available: a, b"));
    }
}
