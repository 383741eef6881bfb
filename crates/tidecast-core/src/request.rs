//! Outbound predict request bodies and their defaults.
//!
//! A [`RequestDraft`] is whatever the caller managed to specify; a
//! [`RequestBody`] is the fully-specified payload that goes on the wire.
//! [`apply_defaults`] is the only way from one to the other.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{ExogMap, ExogMatrix};
use crate::exog::{map_to_matrix_with_report, AlignReport};
use crate::ValidationError;

pub const DEFAULT_HORIZON: usize = 14;
pub const DEFAULT_FREQUENCY: &str = "D";
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_CLIP_NON_NEGATIVE: bool = true;
pub const DEFAULT_FLOOR: f64 = 0.0;
pub const MAX_HORIZON: usize = 730;

/// How the server fills exogenous drivers it was not given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExogStrategy {
    Zero,
    #[default]
    Smart,
}

impl ExogStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Smart => "smart",
        }
    }
}

impl Display for ExogStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExogStrategy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(Self::Zero),
            "smart" => Ok(Self::Smart),
            _ => Err(ValidationError::InvalidStrategy {
                value: value.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoExogFlags {
    pub use_auto_exog: bool,
    pub exog_strategy: ExogStrategy,
    pub clip_non_negative: bool,
    pub floor: f64,
}

impl Default for AutoExogFlags {
    fn default() -> Self {
        Self {
            use_auto_exog: true,
            exog_strategy: ExogStrategy::default(),
            clip_non_negative: DEFAULT_CLIP_NON_NEGATIVE,
            floor: DEFAULT_FLOOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoBody {
    pub horizon: usize,
    pub frequency: String,
    pub alpha: f64,
    #[serde(default)]
    pub flags: AutoExogFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualMapBody {
    pub horizon: usize,
    pub frequency: String,
    pub alpha: f64,
    pub exog: ExogMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualMatrixBody {
    pub horizon: usize,
    pub frequency: String,
    pub alpha: f64,
    pub exog: ExogMatrix,
}

/// Fully-specified predict payload.
///
/// Serialized untagged: the variant is implied by the shape of `exog`,
/// which is what the service expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    ManualMatrix(ManualMatrixBody),
    ManualMap(ManualMapBody),
    Auto(AutoBody),
}

/// Request mode label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExogMode {
    Auto,
    ManualMap,
    ManualMatrix,
}

impl ExogMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::ManualMap => "manual_map",
            Self::ManualMatrix => "manual_matrix",
        }
    }
}

impl RequestBody {
    pub fn mode(&self) -> ExogMode {
        match self {
            Self::Auto(_) => ExogMode::Auto,
            Self::ManualMap(_) => ExogMode::ManualMap,
            Self::ManualMatrix(_) => ExogMode::ManualMatrix,
        }
    }

    pub fn horizon(&self) -> usize {
        match self {
            Self::Auto(body) => body.horizon,
            Self::ManualMap(body) => body.horizon,
            Self::ManualMatrix(body) => body.horizon,
        }
    }

    pub fn frequency(&self) -> &str {
        match self {
            Self::Auto(body) => &body.frequency,
            Self::ManualMap(body) => &body.frequency,
            Self::ManualMatrix(body) => &body.frequency,
        }
    }

    pub fn alpha(&self) -> f64 {
        match self {
            Self::Auto(body) => body.alpha,
            Self::ManualMap(body) => body.alpha,
            Self::ManualMatrix(body) => body.alpha,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let horizon = self.horizon();
        if horizon == 0 || horizon > MAX_HORIZON {
            return Err(ValidationError::InvalidHorizon {
                value: horizon,
                max: MAX_HORIZON,
            });
        }

        let alpha = self.alpha();
        if !(alpha.is_finite() && alpha > 0.0 && alpha < 1.0) {
            return Err(ValidationError::InvalidAlpha {
                value: alpha.to_string(),
            });
        }

        if self.frequency().trim().is_empty() {
            return Err(ValidationError::EmptyFrequency);
        }

        match self {
            Self::Auto(body) if !body.flags.floor.is_finite() => {
                Err(ValidationError::NonFiniteFloor)
            }
            Self::ManualMap(body) => validate_map(&body.exog, horizon),
            Self::ManualMatrix(body) => validate_matrix(&body.exog, horizon),
            Self::Auto(_) => Ok(()),
        }
    }

    /// Converts a map body into the dense form using the declared column
    /// order. Other variants are returned as-is.
    pub fn into_matrix(self, columns: &[String]) -> (Self, Option<AlignReport>) {
        match self {
            Self::ManualMap(body) => {
                let (exog, report) = map_to_matrix_with_report(&body.exog, columns, body.horizon);
                let matrix = Self::ManualMatrix(ManualMatrixBody {
                    horizon: body.horizon,
                    frequency: body.frequency,
                    alpha: body.alpha,
                    exog,
                });
                (matrix, Some(report))
            }
            other => (other, None),
        }
    }
}

/// Every column must already be sized to the horizon; see
/// [`crate::exog::resize_map`].
fn validate_map(map: &ExogMap, horizon: usize) -> Result<(), ValidationError> {
    for column in map.columns() {
        let actual = map.get(column).map_or(0, <[f64]>::len);
        if actual != horizon {
            return Err(ValidationError::MapColumnLength {
                column: column.to_owned(),
                expected: horizon,
                actual,
            });
        }
    }
    Ok(())
}

fn validate_matrix(matrix: &ExogMatrix, horizon: usize) -> Result<(), ValidationError> {
    if matrix.rows.len() != horizon {
        return Err(ValidationError::MatrixRowCount {
            expected: horizon,
            actual: matrix.rows.len(),
        });
    }
    for (row, values) in matrix.rows.iter().enumerate() {
        if values.len() != matrix.columns.len() {
            return Err(ValidationError::MatrixRowWidth {
                row,
                expected: matrix.columns.len(),
                actual: values.len(),
            });
        }
    }
    Ok(())
}

/// Exogenous payload supplied by the caller, in either accepted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExogPayload {
    Matrix(ExogMatrix),
    Map(ExogMap),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftFlags {
    #[serde(default)]
    pub exog_strategy: Option<ExogStrategy>,
    #[serde(default)]
    pub clip_non_negative: Option<bool>,
    #[serde(default)]
    pub floor: Option<f64>,
}

/// Partially-specified request as assembled from user input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDraft {
    #[serde(default)]
    pub horizon: Option<usize>,
    #[serde(default, alias = "freq")]
    pub frequency: Option<String>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub exog: Option<ExogPayload>,
    #[serde(default)]
    pub flags: DraftFlags,
}

impl RequestDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_exog_map(mut self, exog: ExogMap) -> Self {
        self.exog = Some(ExogPayload::Map(exog));
        self
    }

    pub fn with_exog_matrix(mut self, exog: ExogMatrix) -> Self {
        self.exog = Some(ExogPayload::Matrix(exog));
        self
    }

    pub fn with_strategy(mut self, strategy: ExogStrategy) -> Self {
        self.flags.exog_strategy = Some(strategy);
        self
    }

    pub fn with_clip_non_negative(mut self, clip: bool) -> Self {
        self.flags.clip_non_negative = Some(clip);
        self
    }

    pub fn with_floor(mut self, floor: f64) -> Self {
        self.flags.floor = Some(floor);
        self
    }
}

/// Produces a fully-specified body.
///
/// Without an exogenous payload the result is a canonical auto body with
/// `use_auto_exog = true` and the caller's flags merged over the defaults.
/// A supplied payload is passed through untouched.
pub fn apply_defaults(draft: RequestDraft) -> RequestBody {
    let horizon = draft.horizon.unwrap_or(DEFAULT_HORIZON);
    let frequency = draft
        .frequency
        .filter(|frequency| !frequency.trim().is_empty())
        .unwrap_or_else(|| String::from(DEFAULT_FREQUENCY));
    let alpha = draft.alpha.unwrap_or(DEFAULT_ALPHA);

    match draft.exog {
        Some(ExogPayload::Map(exog)) => RequestBody::ManualMap(ManualMapBody {
            horizon,
            frequency,
            alpha,
            exog,
        }),
        Some(ExogPayload::Matrix(exog)) => RequestBody::ManualMatrix(ManualMatrixBody {
            horizon,
            frequency,
            alpha,
            exog,
        }),
        None => RequestBody::Auto(AutoBody {
            horizon,
            frequency,
            alpha,
            flags: AutoExogFlags {
                use_auto_exog: true,
                exog_strategy: draft.flags.exog_strategy.unwrap_or_default(),
                clip_non_negative: draft
                    .flags
                    .clip_non_negative
                    .unwrap_or(DEFAULT_CLIP_NON_NEGATIVE),
                floor: draft.flags.floor.unwrap_or(DEFAULT_FLOOR),
            },
        }),
    }
}
