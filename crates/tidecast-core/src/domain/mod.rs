//! # Domain Models
//!
//! Wire and normalized types exchanged with the forecasting service.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ExogMeta`] | Declared exogenous column order |
//! | [`ForecastPointRaw`] / [`ForecastPoint`] | Forecast point before/after coercion |
//! | [`ForecastResponseRaw`] / [`ForecastResponse`] | Predict envelope |
//! | [`MetricsResponseRaw`] / [`MetricsResponse`] | Backtest metrics envelope |
//! | [`ExogMap`] / [`ExogMatrix`] | Exogenous drivers, keyed or dense |
//! | [`EvalDate`] | `yyyy-MM-dd` evaluation date |
//!
//! Raw types accept anything the service might plausibly send; the
//! normalized twins are produced by [`crate::normalize`] and never carry
//! NaN.

mod date;
mod exog;
mod forecast;
mod metrics;

pub use date::EvalDate;
pub use exog::{ExogMap, ExogMatrix};
pub use forecast::{
    ExogMeta, ForecastPoint, ForecastPointRaw, ForecastResponse, ForecastResponseRaw,
};
pub use metrics::{
    EvalWindow, MetricsResponse, MetricsResponseRaw, MetricsRow, MetricsRowRaw, MetricsSummary,
    MetricsSummaryRaw,
};
