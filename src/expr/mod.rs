//! Condition evaluation for extracted metric values
//!
//! The web provider hands the value it extracted from a response to an
//! [`Evaluator`], which decides whether the measurement is `Successful`,
//! `Failed` or `Inconclusive`. [`ConditionEvaluator`] is the default
//! implementation, driven by the metric's CEL `successCondition` and
//! `failureCondition`.

mod evaluator;

pub use evaluator::{ConditionEvaluator, Evaluator, RESULT_VARIABLE};
