//! Residual and absolute-error histograms.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_MIN_BINS: usize = 5;
pub const DEFAULT_MAX_BINS: usize = 60;

/// Which domain the bins span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramMode {
    /// Symmetric around zero: `[-a, a]` with `a = max(|min|, |max|)`.
    #[default]
    Residual,
    /// `[max(0, min), max]`.
    Absolute,
}

impl HistogramMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Residual => "residual",
            Self::Absolute => "absolute",
        }
    }
}

impl Display for HistogramMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistogramMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "residual" => Ok(Self::Residual),
            "absolute" | "abs" => Ok(Self::Absolute),
            _ => Err(ValidationError::InvalidHistogramMode {
                value: value.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower_edge: f64,
    pub upper_edge: f64,
    pub center: f64,
    pub count: usize,
}

/// Buckets samples into equal-width bins.
///
/// The requested bin count is clamped into `[min_bins, max_bins]`. A sample
/// whose domain has no width gets one degenerate bin instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramBinner {
    min_bins: usize,
    max_bins: usize,
}

impl Default for HistogramBinner {
    fn default() -> Self {
        Self {
            min_bins: DEFAULT_MIN_BINS,
            max_bins: DEFAULT_MAX_BINS,
        }
    }
}

impl HistogramBinner {
    /// A binner with its own clamp range. Bounds are reordered if needed and
    /// the lower bound is at least 1.
    pub fn with_range(min_bins: usize, max_bins: usize) -> Self {
        let (low, high) = if min_bins <= max_bins {
            (min_bins, max_bins)
        } else {
            (max_bins, min_bins)
        };
        Self {
            min_bins: low.max(1),
            max_bins: high.max(1),
        }
    }

    pub fn min_bins(&self) -> usize {
        self.min_bins
    }

    pub fn max_bins(&self) -> usize {
        self.max_bins
    }

    pub fn clamp_bins(&self, bin_count: usize) -> usize {
        bin_count.clamp(self.min_bins, self.max_bins)
    }

    /// Bins the finite values of `values` over the domain `mode` selects.
    ///
    /// Returns an empty vector when no value is finite. Values outside the
    /// domain (negatives in absolute mode) are dropped, not clipped.
    pub fn bin(&self, values: &[f64], bin_count: usize, mode: HistogramMode) -> Vec<HistogramBin> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let Some((min, max)) = bounds(&finite) else {
            return Vec::new();
        };

        let (lower, upper) = match mode {
            HistogramMode::Residual => {
                let reach = min.abs().max(max.abs());
                (-reach, reach)
            }
            HistogramMode::Absolute => {
                let lower = min.max(0.0);
                (lower, max.max(lower))
            }
        };

        let in_domain = finite
            .iter()
            .copied()
            .filter(|value| (lower..=upper).contains(value));
        let Some(edges) = bin_edges(lower, upper, self.clamp_bins(bin_count)) else {
            return vec![degenerate_bin(lower, upper, in_domain.count())];
        };

        let bin_count = edges.len() - 1;
        let mut counts = vec![0_usize; bin_count];
        for value in in_domain {
            counts[bin_index(&edges, value)] += 1;
        }

        counts
            .into_iter()
            .enumerate()
            .map(|(index, count)| {
                let (lower_edge, upper_edge) = (edges[index], edges[index + 1]);
                HistogramBin {
                    lower_edge,
                    upper_edge,
                    center: lower_edge / 2.0 + upper_edge / 2.0,
                    count,
                }
            })
            .collect()
    }
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().copied().fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

/// `bin_count + 1` strictly increasing edges from `lower` to `upper`.
///
/// Edges interpolate between the bounds instead of stepping by a width, so
/// spans wider than `f64::MAX` stay finite. Returns `None` when the span is
/// zero or too narrow to split into distinct edges.
fn bin_edges(lower: f64, upper: f64, bin_count: usize) -> Option<Vec<f64>> {
    if upper <= lower {
        return None;
    }

    let edges = (0..=bin_count)
        .map(|index| {
            if index == bin_count {
                return upper;
            }
            let t = index as f64 / bin_count as f64;
            lower * (1.0 - t) + upper * t
        })
        .collect::<Vec<_>>();

    edges
        .windows(2)
        .all(|pair| pair[0] < pair[1])
        .then_some(edges)
}

/// Index of the bin holding `value`, with `[lower, upper)` bins and the
/// domain maximum in the last bin.
fn bin_index(edges: &[f64], value: f64) -> usize {
    let bin_count = edges.len() - 1;
    let (lower, upper) = (edges[0], edges[bin_count]);
    let t = (value / 2.0 - lower / 2.0) / (upper / 2.0 - lower / 2.0);
    // Saturating cast; the walk below settles rounding at the edges.
    let mut index = ((t * bin_count as f64).floor() as usize).min(bin_count - 1);
    while index > 0 && value < edges[index] {
        index -= 1;
    }
    while index + 1 < bin_count && value >= edges[index + 1] {
        index += 1;
    }
    index
}

/// The single bin used when the domain is too narrow to split. Its width is
/// at least 1 and always covers `[lower, upper]`.
fn degenerate_bin(lower: f64, upper: f64, count: usize) -> HistogramBin {
    let width = (upper - lower)
        .max(lower.abs() * f64::EPSILON * 2.0)
        .max(1.0);
    let (lower_edge, upper_edge) = if (lower + width).is_finite() {
        (lower, lower + width)
    } else {
        (lower - width, lower)
    };
    HistogramBin {
        lower_edge,
        upper_edge,
        center: lower_edge / 2.0 + upper_edge / 2.0,
        count,
    }
}

/// Bins with the default `[5, 60]` clamp.
pub fn bin(values: &[f64], bin_count: usize, mode: HistogramMode) -> Vec<HistogramBin> {
    HistogramBinner::default().bin(values, bin_count, mode)
}
