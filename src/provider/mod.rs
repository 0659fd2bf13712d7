//! The web metric provider
//!
//! This module turns a declarative [`WebMetric`](crate::metric::WebMetric) into
//! a [`Measurement`] by issuing one HTTP request and classifying the response.
//!
//! # Implementation Model
//!
//! A provider is assembled once per metric definition:
//! - [`WebClient`] carries the timeout, TLS settings and the optional OAuth2
//!   client-credentials layer
//! - [`PathExtractor`] is the compiled path expression
//!
//! Each call to [`Provider::run`] then walks the same pipeline:
//!
//! 1. [`build_request`] validates the definition and builds the request
//! 2. [`WebClient::execute`] sends it, attaching a bearer token when configured
//! 3. [`classify_response`] checks the status, decodes the body, extracts the
//!    first matching value and hands it to an [`Evaluator`](crate::expr::Evaluator)
//!
//! Any failure along the way becomes a measurement in the `Error` phase; `run`
//! never returns an error to its caller. There are no retries.

mod http_client;
mod json_path;
mod log_context;
mod oauth2;
mod request;
mod response;
mod web_provider;

use crate::Result;
use crate::metric::{AnalysisRun, Measurement, Metric};
use std::collections::HashMap;

pub use http_client::WebClient;
pub use json_path::{DEFAULT_EXPRESSION, PathExtractor};
pub use log_context::LogContext;
pub use oauth2::ClientCredentials;
pub use request::{CONTENT_TYPE_JSON, build_request};
pub use response::{Verdict, classify_body, classify_response};
pub use web_provider::WebMetricProvider;

/// Type name reported by the web metric provider
pub const PROVIDER_TYPE: &str = "Web";

/// Operations an analysis controller invokes on a metric provider.
pub trait Provider: Send + Sync {
    /// The provider's type name
    fn provider_type(&self) -> &'static str;

    /// Take a measurement
    fn run(&self, run: &AnalysisRun, metric: &Metric) -> impl Future<Output = Measurement> + Send;

    /// Continue a measurement that was left in progress
    fn resume(&self, run: &AnalysisRun, metric: &Metric, measurement: Measurement) -> Measurement;

    /// Stop a measurement that is in progress
    fn terminate(&self, run: &AnalysisRun, metric: &Metric, measurement: Measurement) -> Measurement;

    /// Reclaim provider-owned resources, keeping at most `limit` measurements
    fn garbage_collect(&self, run: &AnalysisRun, metric: &Metric, limit: usize) -> Result<()>;

    /// Extra metadata to store alongside the metric's results
    fn metadata(&self, metric: &Metric) -> Option<HashMap<String, String>>;
}
