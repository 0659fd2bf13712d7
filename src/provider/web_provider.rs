use super::http_client::WebClient;
use super::json_path::PathExtractor;
use super::log_context::LogContext;
use super::request::build_request;
use super::response::{Verdict, classify_response};
use super::{PROVIDER_TYPE, Provider};
use crate::Result;
use crate::expr::Evaluator;
use crate::metric::{AnalysisRun, Measurement, Metric};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

const LOG_TARGET: &str = "webmetric";

/// Takes measurements by querying an HTTP endpoint.
///
/// The client and extractor are built once from the metric definition and
/// never mutated afterwards, so one provider can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct WebMetricProvider {
    log_ctx: LogContext,
    client: WebClient,
    extractor: Arc<PathExtractor>,
    evaluator: Arc<dyn Evaluator>,
}

impl WebMetricProvider {
    #[must_use]
    pub fn new(log_ctx: LogContext, client: WebClient, extractor: PathExtractor, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            log_ctx,
            client,
            extractor: Arc::new(extractor),
            evaluator,
        }
    }

    /// Build a provider for `metric`, compiling its client and path expression up front
    pub fn from_metric(log_ctx: LogContext, metric: &Metric, evaluator: Arc<dyn Evaluator>) -> Result<Self> {
        let web = metric.web()?;
        let client = WebClient::from_metric(web)?;
        let extractor = PathExtractor::from_metric(web)?;

        Ok(Self::new(log_ctx, client, extractor, evaluator))
    }

    async fn measure(&self, metric: &Metric) -> Result<Verdict> {
        let web = metric.web()?;
        let request = build_request(web)?;
        let response = self.client.execute(request).await?;

        log::debug!(target: LOG_TARGET, "{}Received HTTP {} from '{}'", self.log_ctx, response.status(), web.url);

        classify_response(response, &self.extractor, self.evaluator.as_ref(), metric).await
    }
}

impl Provider for WebMetricProvider {
    fn provider_type(&self) -> &'static str {
        PROVIDER_TYPE
    }

    async fn run(&self, run: &AnalysisRun, metric: &Metric) -> Measurement {
        let measurement = Measurement::started(Utc::now());

        match self.measure(metric).await {
            Ok(verdict) => {
                log::debug!(
                    target: LOG_TARGET,
                    "{}Measured '{}' for analysis run '{}': {}",
                    self.log_ctx,
                    verdict.value,
                    run.name,
                    verdict.phase
                );
                measurement.complete(verdict.value, verdict.phase, Utc::now())
            }
            Err(e) => {
                log::debug!(target: LOG_TARGET, "{}Measurement for analysis run '{}' failed: {e:#}", self.log_ctx, run.name);
                measurement.into_error(&e)
            }
        }
    }

    /// All work happens in [`run`](Self::run); a web measurement is never left in progress.
    fn resume(&self, _run: &AnalysisRun, _metric: &Metric, measurement: Measurement) -> Measurement {
        log::warn!(target: LOG_TARGET, "{}Web metric provider should not execute the resume method", self.log_ctx);
        measurement
    }

    /// All work happens in [`run`](Self::run); there is nothing in flight to stop.
    fn terminate(&self, _run: &AnalysisRun, _metric: &Metric, measurement: Measurement) -> Measurement {
        log::warn!(target: LOG_TARGET, "{}Web metric provider should not execute the terminate method", self.log_ctx);
        measurement
    }

    /// The provider keeps no persistent resources, so there is nothing to collect.
    fn garbage_collect(&self, _run: &AnalysisRun, _metric: &Metric, _limit: usize) -> Result<()> {
        Ok(())
    }

    fn metadata(&self, _metric: &Metric) -> Option<HashMap<String, String>> {
        None
    }
}
