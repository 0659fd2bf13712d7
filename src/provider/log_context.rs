use crate::metric::{AnalysisRun, Metric};
use core::fmt;

/// Key/value fields prefixed to every log message a provider emits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    fields: Vec<(&'static str, String)>,
}

impl LogContext {
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Context identifying a metric within an analysis run
    #[must_use]
    pub fn for_metric(run: &AnalysisRun, metric: &Metric) -> Self {
        let mut ctx = Self::new().with_field("analysisrun", &run.name);
        if !run.namespace.is_empty() {
            ctx = ctx.with_field("namespace", &run.namespace);
        }
        ctx.with_field("metric", &metric.name)
    }

    #[must_use]
    pub fn with_field(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((key, value.into()));
        self
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return Ok(());
        }

        f.write_str("[")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("] ")
    }
}
