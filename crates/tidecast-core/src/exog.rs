//! Exogenous driver alignment.
//!
//! The model is order-sensitive and never sees column names, so the dense
//! matrix always follows the server-declared `columns`, not the map's own
//! key order. Nothing here fails: unknown or missing values become `0`.

use serde::Serialize;

use crate::coerce::{coerce_cell, to_number_optional, to_number_required, RawNumeric};
use crate::csv_codec::CsvDocument;
use crate::domain::{ExogMap, ExogMatrix};

/// Shape repairs applied while aligning a map to the declared columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignReport {
    /// Present in the map but not declared by the server.
    pub dropped_columns: Vec<String>,
    /// Declared by the server but absent from the map.
    pub zero_filled_columns: Vec<String>,
    pub padded_cells: usize,
    pub truncated_cells: usize,
}

impl AlignReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_columns.is_empty()
            && self.zero_filled_columns.is_empty()
            && self.padded_cells == 0
            && self.truncated_cells == 0
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.dropped_columns.is_empty() {
            warnings.push(format!(
                "ignored {} undeclared exogenous column(s): {}",
                self.dropped_columns.len(),
                self.dropped_columns.join(", ")
            ));
        }
        if !self.zero_filled_columns.is_empty() {
            warnings.push(format!(
                "zero-filled {} missing exogenous column(s): {}",
                self.zero_filled_columns.len(),
                self.zero_filled_columns.join(", ")
            ));
        }
        if self.padded_cells > 0 {
            warnings.push(format!(
                "padded {} exogenous cell(s) with 0",
                self.padded_cells
            ));
        }
        if self.truncated_cells > 0 {
            warnings.push(format!(
                "dropped {} exogenous cell(s) beyond the horizon",
                self.truncated_cells
            ));
        }
        warnings
    }
}

/// Coerces an optional cell; absent and non-finite cells are `0`.
fn cell_or_zero(cell: Option<&f64>) -> f64 {
    to_number_required(&RawNumeric::from(cell.copied()), 0.0)
}

fn value_at(map: &ExogMap, column: &str, row: usize) -> f64 {
    cell_or_zero(map.get(column).and_then(|values| values.get(row)))
}

/// Builds the dense matrix the server expects.
pub fn map_to_matrix(map: &ExogMap, columns: &[String], horizon: usize) -> ExogMatrix {
    map_to_matrix_with_report(map, columns, horizon).0
}

pub fn map_to_matrix_with_report(
    map: &ExogMap,
    columns: &[String],
    horizon: usize,
) -> (ExogMatrix, AlignReport) {
    let rows = (0..horizon)
        .map(|row| {
            columns
                .iter()
                .map(|column| value_at(map, column, row))
                .collect()
        })
        .collect();

    let mut report = AlignReport {
        dropped_columns: map
            .columns()
            .filter(|column| !columns.iter().any(|declared| declared == column))
            .map(str::to_owned)
            .collect(),
        ..AlignReport::default()
    };
    for column in columns {
        match map.get(column) {
            Some(values) => {
                report.padded_cells += horizon.saturating_sub(values.len());
                report.truncated_cells += values.len().saturating_sub(horizon);
            }
            None if !report.zero_filled_columns.contains(column) => {
                report.zero_filled_columns.push(column.clone())
            }
            None => {}
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            dropped = report.dropped_columns.len(),
            zero_filled = report.zero_filled_columns.len(),
            padded_cells = report.padded_cells,
            truncated_cells = report.truncated_cells,
            "exogenous map repaired while aligning to declared columns"
        );
    }

    (
        ExogMatrix {
            columns: columns.to_vec(),
            rows,
        },
        report,
    )
}

/// Inverse of [`map_to_matrix`]: re-keys a matrix by its own column names.
pub fn matrix_to_map(matrix: &ExogMatrix) -> ExogMap {
    matrix
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let values = matrix
                .rows
                .iter()
                .map(|row| cell_or_zero(row.get(index)))
                .collect::<Vec<_>>();
            (column.clone(), values)
        })
        .collect()
}

/// Gives every declared column exactly `horizon` values, keeping existing
/// values by index and zero-filling new positions.
pub fn resize_map(map: &ExogMap, columns: &[String], horizon: usize) -> ExogMap {
    columns
        .iter()
        .map(|column| {
            let values = (0..horizon)
                .map(|row| value_at(map, column, row))
                .collect::<Vec<_>>();
            (column.clone(), values)
        })
        .collect()
}

/// Outcome of turning an imported CSV into an exogenous map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub matched_columns: Vec<String>,
    /// Headers that do not name a declared column (e.g. a `ds` date column).
    pub ignored_headers: Vec<String>,
    pub missing_columns: Vec<String>,
    pub rows_read: usize,
    pub rows_padded: usize,
    pub rows_truncated: usize,
    pub ragged_rows: usize,
    /// Non-empty cells that were not numbers and became `0`.
    pub unparsable_cells: usize,
}

impl ImportReport {
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.ignored_headers.is_empty() {
            warnings.push(format!(
                "ignored CSV column(s) not used by the model: {}",
                self.ignored_headers.join(", ")
            ));
        }
        if !self.missing_columns.is_empty() {
            warnings.push(format!(
                "CSV is missing column(s), filled with 0: {}",
                self.missing_columns.join(", ")
            ));
        }
        if self.rows_padded > 0 {
            warnings.push(format!(
                "CSV has {} row(s), padded {} row(s) with 0 to reach the horizon",
                self.rows_read, self.rows_padded
            ));
        }
        if self.rows_truncated > 0 {
            warnings.push(format!(
                "CSV has {} row(s), dropped {} beyond the horizon",
                self.rows_read, self.rows_truncated
            ));
        }
        if self.ragged_rows > 0 {
            warnings.push(format!(
                "{} CSV row(s) did not match the header width",
                self.ragged_rows
            ));
        }
        if self.unparsable_cells > 0 {
            warnings.push(format!(
                "{} CSV cell(s) were not numbers and became 0",
                self.unparsable_cells
            ));
        }
        warnings
    }
}

/// Reads declared columns out of an imported document and sizes them to
/// `horizon`. Header names are matched after trimming; the first matching
/// header wins.
pub fn import_exog(
    document: &CsvDocument,
    columns: &[String],
    horizon: usize,
) -> (ExogMap, ImportReport) {
    let mut report = ImportReport {
        rows_read: document.rows.len(),
        rows_padded: horizon.saturating_sub(document.rows.len()),
        rows_truncated: document.rows.len().saturating_sub(horizon),
        ragged_rows: document.ragged_rows(),
        ignored_headers: document
            .headers
            .iter()
            .map(|header| header.trim())
            .filter(|header| !columns.iter().any(|column| column == header))
            .map(str::to_owned)
            .collect(),
        ..ImportReport::default()
    };

    let mut map = ExogMap::new();
    for column in columns {
        let Some(index) = document
            .headers
            .iter()
            .position(|header| header.trim() == column)
        else {
            if !report.missing_columns.contains(column) {
                report.missing_columns.push(column.clone());
            }
            continue;
        };

        let values = document
            .rows
            .iter()
            .take(horizon)
            .map(|row| {
                let cell = row.get(index).map(String::as_str).unwrap_or("");
                if !cell.trim().is_empty()
                    && to_number_optional(&RawNumeric::from(cell)).is_none()
                {
                    report.unparsable_cells += 1;
                }
                coerce_cell(cell, 0.0)
            })
            .collect::<Vec<_>>();
        map.insert(column.clone(), values);
        report.matched_columns.push(column.clone());
    }

    (resize_map(&map, columns, horizon), report)
}

/// Builds the downloadable template: declared columns as the header row and
/// exactly `horizon` rows of plain decimal values.
pub fn exog_template(map: &ExogMap, columns: &[String], horizon: usize) -> CsvDocument {
    let rows = (0..horizon)
        .map(|row| {
            columns
                .iter()
                .map(|column| format_decimal(value_at(map, column, row)))
                .collect()
        })
        .collect();

    CsvDocument::new(columns.to_vec(), rows)
}

/// Plain decimal text: no exponent, no thousands separators, no `-0`.
pub fn format_decimal(value: f64) -> String {
    if value == 0.0 {
        return String::from("0");
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_codec::parse;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn matrix_follows_declared_order_and_zero_fills() {
        let map: ExogMap = [("ADR", vec![1.0, 2.0, 3.0])].into_iter().collect();

        let matrix = map_to_matrix(&map, &columns(&["ADR", "RoomNights"]), 3);

        assert_eq!(matrix.columns, columns(&["ADR", "RoomNights"]));
        assert_eq!(
            matrix.rows,
            vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]]
        );
    }

    #[test]
    fn matrix_ignores_map_key_order() {
        let map: ExogMap = [("b", vec![2.0]), ("a", vec![1.0])].into_iter().collect();

        let matrix = map_to_matrix(&map, &columns(&["b", "a"]), 1);
        assert_eq!(matrix.rows, vec![vec![2.0, 1.0]]);
    }

    #[test]
    fn report_counts_every_repair() {
        let map: ExogMap = [
            ("short", vec![1.0]),
            ("long", vec![1.0, 2.0, 3.0, 4.0]),
            ("extra", vec![9.0]),
        ]
        .into_iter()
        .collect();

        let (matrix, report) =
            map_to_matrix_with_report(&map, &columns(&["short", "long", "absent"]), 2);

        assert_eq!(matrix.rows, vec![vec![1.0, 1.0, 0.0], vec![0.0, 2.0, 0.0]]);
        assert_eq!(report.dropped_columns, columns(&["extra"]));
        assert_eq!(report.zero_filled_columns, columns(&["absent"]));
        assert_eq!(report.padded_cells, 1);
        assert_eq!(report.truncated_cells, 2);
        assert_eq!(report.warnings().len(), 4);
    }

    #[test]
    fn non_finite_values_become_zero() {
        let map: ExogMap = [("x", vec![f64::NAN, f64::INFINITY, 2.0])]
            .into_iter()
            .collect();

        let matrix = map_to_matrix(&map, &columns(&["x"]), 3);
        assert_eq!(matrix.rows, vec![vec![0.0], vec![0.0], vec![2.0]]);
    }

    #[test]
    fn resize_pads_truncates_and_drops_undeclared() {
        let map: ExogMap = [("a", vec![1.0, 2.0, 3.0]), ("gone", vec![5.0])]
            .into_iter()
            .collect();

        let grown = resize_map(&map, &columns(&["a", "b"]), 5);
        assert_eq!(grown.get("a"), Some(&[1.0, 2.0, 3.0, 0.0, 0.0][..]));
        assert_eq!(grown.get("b"), Some(&[0.0; 5][..]));
        assert!(!grown.contains("gone"));

        let shrunk = resize_map(&map, &columns(&["a"]), 2);
        assert_eq!(shrunk.get("a"), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn matrix_round_trips_to_map() {
        let map: ExogMap = [("a", vec![1.0, 2.0]), ("b", vec![3.0, 4.0])]
            .into_iter()
            .collect();
        let matrix = map_to_matrix(&map, &columns(&["b", "a"]), 2);
        assert_eq!(matrix_to_map(&matrix), map);
    }

    #[test]
    fn import_reads_declared_columns_and_reports_the_rest() {
        let document = parse(
            "ds, ADR ,Promo\n2024-01-01,100.5,x\n2024-01-02,101\n2024-01-03,102,1,extra",
            ',',
        );

        let (map, report) = import_exog(&document, &columns(&["ADR", "Promo", "Holiday"]), 2);

        assert_eq!(map.get("ADR"), Some(&[100.5, 101.0][..]));
        assert_eq!(map.get("Promo"), Some(&[0.0, 0.0][..]));
        assert_eq!(map.get("Holiday"), Some(&[0.0, 0.0][..]));
        assert_eq!(report.matched_columns, columns(&["ADR", "Promo"]));
        assert_eq!(report.ignored_headers, columns(&["ds"]));
        assert_eq!(report.missing_columns, columns(&["Holiday"]));
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_truncated, 1);
        assert_eq!(report.rows_padded, 0);
        assert_eq!(report.ragged_rows, 2);
        assert_eq!(report.unparsable_cells, 1);
    }

    #[test]
    fn template_has_declared_header_and_horizon_rows() {
        let map: ExogMap = [("ADR", vec![1.5, -0.0])].into_iter().collect();

        let document = exog_template(&map, &columns(&["ADR", "RoomNights"]), 3);

        assert_eq!(document.headers, columns(&["ADR", "RoomNights"]));
        assert_eq!(document.rows.len(), 3);
        assert_eq!(document.rows[0], columns(&["1.5", "0"]));
        assert_eq!(document.rows[1], columns(&["0", "0"]));
    }

    #[test]
    fn decimals_never_use_exponents() {
        assert_eq!(format_decimal(1e21), "1000000000000000000000");
        assert_eq!(format_decimal(0.25), "0.25");
        assert_eq!(format_decimal(-0.0), "0");
    }
}
