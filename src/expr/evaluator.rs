//! Evaluator for turning an extracted value into a measurement verdict
//!
//! Conditions are CEL expressions evaluated with the extracted value bound to
//! the `result` variable.

use crate::Result;
use crate::metric::{AnalysisPhase, Metric};
use cel_interpreter::{Context, Program, Value, objects::Map};
use core::fmt::Debug;
use ohno::{IntoAppError, app_err};
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the variable holding the extracted value inside a condition
pub const RESULT_VARIABLE: &str = "result";

/// Maps an extracted value and a metric's conditions to a verdict.
pub trait Evaluator: Send + Sync + Debug {
    fn evaluate(&self, value: &serde_json::Value, metric: &Metric) -> Result<AnalysisPhase>;
}

/// Evaluates `successCondition` / `failureCondition` as CEL programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl Evaluator for ConditionEvaluator {
    /// # Evaluation rules
    /// 1. No conditions: `Successful`
    /// 2. Only a success condition: `Failed` unless it holds
    /// 3. Only a failure condition: `Successful` unless it holds
    /// 4. Both: `Failed` if the failure condition holds, `Successful` if the success
    ///    condition holds, `Inconclusive` otherwise
    fn evaluate(&self, value: &serde_json::Value, metric: &Metric) -> Result<AnalysisPhase> {
        let context = build_cel_context(value);

        let success = optional_condition(&metric.success_condition, "successCondition", &context)?;
        let failure = optional_condition(&metric.failure_condition, "failureCondition", &context)?;

        let (success, failure) = match (success, failure) {
            (None, None) => return Ok(AnalysisPhase::Successful),
            (Some(s), None) => (s, !s),
            (None, Some(f)) => (!f, f),
            (Some(s), Some(f)) => (s, f),
        };

        Ok(if failure {
            AnalysisPhase::Failed
        } else if success {
            AnalysisPhase::Successful
        } else {
            AnalysisPhase::Inconclusive
        })
    }
}

fn optional_condition(condition: &str, name: &str, context: &Context<'_>) -> Result<Option<bool>> {
    if condition.trim().is_empty() {
        return Ok(None);
    }

    let program = Program::compile(condition).map_err(|e| app_err!("Could not parse {name} '{condition}': {e}"))?;
    evaluate_condition(&program, name, context).map(Some)
}

/// Evaluates a compiled boolean condition against a context
fn evaluate_condition(program: &Program, name: &str, context: &Context<'_>) -> Result<bool> {
    match program
        .execute(context)
        .into_app_err_with(|| format!("Could not evaluate {name}"))?
    {
        Value::Bool(b) => Ok(b),
        other => Err(app_err!("{name} did not return a boolean, got '{other:?}' instead")),
    }
}

fn build_cel_context(value: &serde_json::Value) -> Context<'static> {
    let mut context = Context::default();
    context.add_variable_from_value(RESULT_VARIABLE, convert_json_value(value));
    context
}

/// Convert a decoded JSON value to a CEL value
fn convert_json_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_u64().map(Value::UInt))
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::String(Arc::new(s.clone())),
        serde_json::Value::Array(values) => Value::List(Arc::new(values.iter().map(convert_json_value).collect())),
        serde_json::Value::Object(fields) => {
            let fields: HashMap<Arc<String>, Value> = fields
                .iter()
                .map(|(k, v)| (Arc::new(k.clone()), convert_json_value(v)))
                .collect();
            Value::Map(Map::from(fields))
        }
    }
}
