//! Declarative metric definitions and measurement records
//!
//! A [`Metric`] is the read-only input handed to a provider by the analysis
//! controller. Its [`WebMetric`] block describes the HTTP request to issue,
//! how to extract a value from the response, and how to authenticate.
//!
//! A [`Measurement`] is the output: a timestamped value with an
//! [`AnalysisPhase`] verdict that the controller records and aggregates.

mod measurement;
mod metric_def;

pub use measurement::{AnalysisPhase, AnalysisRun, Measurement};
pub use metric_def::{
    Authentication, DEFAULT_TIMEOUT, Metric, MetricProvider, OAuth2Config, WebMetric, WebMetricHeader, WebMetricMethod,
};
