use super::json_path::PathExtractor;
use crate::Result;
use crate::expr::Evaluator;
use crate::metric::{AnalysisPhase, Metric};
use core::num::FpCategory;
use ohno::{IntoAppError, app_err, bail};
use serde_json::Value;

/// Largest magnitude below which every whole `f64` converts to `i64` exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// The value and verdict produced from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Canonical JSON text of the extracted value, or the raw body for non-JSON responses
    pub value: String,
    pub phase: AnalysisPhase,
}

/// Classify a completed HTTP response
pub async fn classify_response(
    response: reqwest::Response,
    extractor: &PathExtractor,
    evaluator: &dyn Evaluator,
    metric: &Metric,
) -> Result<Verdict> {
    let status = response.status();
    if !status.is_success() {
        bail!("received non 2xx response code: {}", status.as_u16());
    }

    let body = response.bytes().await.into_app_err("received no bytes in response")?;
    classify_body(&body, extractor, evaluator, metric)
}

/// Classify the body of a successful response.
///
/// A body that is not JSON is returned verbatim and is always `Successful`;
/// the path expression only applies to JSON documents.
pub fn classify_body(body: &[u8], extractor: &PathExtractor, evaluator: &dyn Evaluator, metric: &Metric) -> Result<Verdict> {
    let Ok(data) = serde_json::from_slice::<Value>(body) else {
        return Ok(Verdict {
            value: String::from_utf8_lossy(body).into_owned(),
            phase: AnalysisPhase::Successful,
        });
    };

    let value = first_value(extractor.find_results(&data)).ok_or_else(|| app_err!("result of web metric produced no value"))?;
    let phase = evaluator.evaluate(&value, metric)?;
    let value_string = serde_json::to_string(&whole_floats_as_integers(value)).into_app_err("encoding extracted value")?;

    Ok(Verdict {
        value: value_string,
        phase,
    })
}

/// Store floats holding a whole number as integers, so `5.0` is recorded as `5`
fn whole_floats_as_integers(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract().classify() == FpCategory::Zero && f.abs() <= MAX_SAFE_INTEGER => {
                #[expect(clippy::cast_possible_truncation, reason = "whole numbers within 2^53 convert exactly")]
                let whole = f as i64;
                Value::from(whole)
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(whole_floats_as_integers).collect()),
        Value::Object(fields) => Value::Object(fields.into_iter().map(|(k, v)| (k, whole_floats_as_integers(v))).collect()),
        other => other,
    }
}

/// First value of the first non-empty match-set
fn first_value(results: Vec<Vec<Value>>) -> Option<Value> {
    results.into_iter().flatten().next()
}
