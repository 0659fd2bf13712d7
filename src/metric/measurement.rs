use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Verdict attached to a measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, Display)]
pub enum AnalysisPhase {
    /// No verdict yet; the measurement is still being taken
    #[default]
    Pending,
    Successful,
    Failed,
    Error,

    /// Neither the success nor the failure condition held
    Inconclusive,
}

impl AnalysisPhase {
    /// Returns `true` once the phase can no longer change
    #[must_use]
    pub const fn is_completed(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The record of a single metric measurement.
///
/// A measurement is created with only `started_at` set. It is then completed
/// exactly once: either with a value, a phase and `finished_at` on success, or
/// with [`AnalysisPhase::Error`] and a message on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    #[serde(default)]
    pub phase: AnalysisPhase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Measurement {
    /// Start a new measurement at `now`
    #[must_use]
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(now),
            ..Self::default()
        }
    }

    /// Complete the measurement with a value and verdict
    #[must_use]
    pub fn complete(self, value: String, phase: AnalysisPhase, now: DateTime<Utc>) -> Self {
        Self {
            value,
            phase,
            finished_at: Some(now),
            ..self
        }
    }

    /// Mark the measurement as failed with an error, leaving `finished_at` untouched
    #[must_use]
    pub fn into_error(self, err: &ohno::AppError) -> Self {
        Self {
            phase: AnalysisPhase::Error,
            message: Some(err.to_string()),
            ..self
        }
    }
}

/// The analysis run on whose behalf a measurement is taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalysisRun {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl AnalysisRun {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}
