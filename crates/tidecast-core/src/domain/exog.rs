use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::coerce::{to_number_required, RawNumeric};

/// Column-keyed exogenous driver values, one entry per forecast period.
///
/// Cells are coerced on the way in: numbers, numeric strings, `null` and
/// anything else are all accepted, and whatever is not a finite number
/// becomes `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExogMap(BTreeMap<String, Vec<f64>>);

impl ExogMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `values` under `column`.
    ///
    /// Returns the previous values when the column was already present,
    /// otherwise `None`.
    pub fn insert(&mut self, column: impl Into<String>, values: Vec<f64>) -> Option<Vec<f64>> {
        self.0.insert(column.into(), values)
    }

    /// Returns the values stored for `column`.
    ///
    /// Returns `None` when the column is absent. Lengths are not checked;
    /// see [`crate::exog::resize_map`].
    pub fn get(&self, column: &str) -> Option<&[f64]> {
        self.0.get(column).map(Vec::as_slice)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Column names in lexical order. This is not the server's order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<f64>)> for ExogMap {
    fn from_iter<I: IntoIterator<Item = (K, Vec<f64>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(column, values)| (column.into(), values))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for ExogMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Vec<RawNumeric>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(column, cells)| (column, coerce_cells(&cells)))
            .collect())
    }
}

/// Dense exogenous input in the server-declared column order.
///
/// Built by [`crate::exog::map_to_matrix`], which guarantees `rows.len() ==
/// horizon` and that every row is as wide as `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExogMatrix {
    pub columns: Vec<String>,
    #[serde(deserialize_with = "deserialize_rows")]
    pub rows: Vec<Vec<f64>>,
}

impl ExogMatrix {
    /// Number of rows, which equals the horizon once the matrix is valid.
    pub fn horizon(&self) -> usize {
        self.rows.len()
    }

    /// `true` when every row is exactly as wide as `columns`.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.len() == self.columns.len())
    }
}

fn coerce_cells(cells: &[RawNumeric]) -> Vec<f64> {
    cells
        .iter()
        .map(|cell| to_number_required(cell, 0.0))
        .collect()
}

fn deserialize_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Vec<RawNumeric>>::deserialize(deserializer)?;
    Ok(raw.iter().map(|row| coerce_cells(row)).collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn map_cells_are_coerced_with_zero_fallback() {
        let map: ExogMap =
            serde_json::from_value(json!({"ADR": [1, null, "3", "x"], "Promo": [" 2.5 ", true]}))
                .expect("loose map parses");

        assert_eq!(map.get("ADR"), Some(&[1.0, 0.0, 3.0, 0.0][..]));
        assert_eq!(map.get("Promo"), Some(&[2.5, 0.0][..]));
    }

    #[test]
    fn matrix_cells_are_coerced_with_zero_fallback() {
        let matrix: ExogMatrix = serde_json::from_value(json!({
            "columns": ["ADR", "RoomNights"],
            "rows": [["120", null], [121.5, "NaN"]]
        }))
        .expect("loose matrix parses");

        assert_eq!(matrix.rows, vec![vec![120.0, 0.0], vec![121.5, 0.0]]);
        assert!(matrix.is_rectangular());
    }

    #[test]
    fn map_serializes_as_plain_object() {
        let map: ExogMap = [("ADR", vec![1.0, 2.0])].into_iter().collect();
        assert_eq!(
            serde_json::to_value(&map).expect("serializes"),
            json!({"ADR": [1.0, 2.0]})
        );
    }
}
