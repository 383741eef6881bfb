//! Numeric coercion boundary.
//!
//! The forecasting service may encode numbers as JSON numbers, as strings
//! (to dodge float precision loss), or leave them out entirely. Everything
//! past this module works with plain `f64` values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untrusted numeric value as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumeric {
    Number(f64),
    Text(String),
    /// `null` or an absent field.
    #[default]
    Missing,
    /// Any other JSON value (bool, array, object); coerces like `Missing`.
    Other(Value),
}

impl RawNumeric {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn to_optional(&self) -> Option<f64> {
        to_number_optional(self)
    }

    pub fn to_required(&self, fallback: f64) -> f64 {
        to_number_required(self, fallback)
    }
}

impl From<f64> for RawNumeric {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Option<f64>> for RawNumeric {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::Number)
    }
}

impl From<&str> for RawNumeric {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RawNumeric {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Returns the finite number carried by `value`, or `None`.
///
/// Strings are trimmed first; an empty string is treated as absent rather
/// than zero.
pub fn to_number_optional(value: &RawNumeric) -> Option<f64> {
    let parsed = match value {
        RawNumeric::Number(number) => *number,
        RawNumeric::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        RawNumeric::Missing | RawNumeric::Other(_) => return None,
    };

    parsed.is_finite().then_some(parsed)
}

/// Same as [`to_number_optional`] but substitutes `fallback` for absent values.
pub fn to_number_required(value: &RawNumeric, fallback: f64) -> f64 {
    to_number_optional(value).unwrap_or(fallback)
}

/// Coerces a cell of user-entered text (CSV import, pasted grid).
pub fn coerce_cell(cell: &str, fallback: f64) -> f64 {
    to_number_required(&RawNumeric::Text(cell.to_owned()), fallback)
}
