use crate::Result;
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Timeout applied when a metric does not specify a positive `timeoutSeconds`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A declarative metric definition as found in an analysis template.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub name: String,

    /// Condition which, when true, marks a measurement as successful
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub success_condition: String,

    /// Condition which, when true, marks a measurement as failed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub failure_condition: String,

    pub provider: MetricProvider,
}

impl Metric {
    /// Parse a single metric definition from YAML
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).into_app_err("parsing metric definition")
    }

    /// Returns the web provider block, or an error if the metric is not a web metric
    pub fn web(&self) -> Result<&WebMetric> {
        self.provider
            .web
            .as_ref()
            .ok_or_else(|| app_err!("metric '{}' does not define a web provider", self.name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MetricProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebMetric>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum WebMetricMethod {
    #[default]
    Get,
    Post,
    Put,
}

impl WebMetricMethod {
    #[must_use]
    pub fn as_http(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebMetricHeader {
    pub key: String,
    pub value: String,
}

impl WebMetricHeader {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Web provider block of a metric definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebMetric {
    #[serde(default)]
    pub method: WebMetricMethod,

    pub url: String,

    /// Headers in declaration order; a later entry for the same key replaces an earlier one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<WebMetricHeader>,

    /// Raw request body, sent verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Structured request body, serialized to JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_body: Option<serde_json::Value>,

    #[serde(default)]
    pub timeout_seconds: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub authentication: Authentication,
}

impl WebMetric {
    /// Effective request timeout, falling back to [`DEFAULT_TIMEOUT`] for non-positive values
    #[must_use]
    pub fn timeout(&self) -> Duration {
        u64::try_from(self.timeout_seconds)
            .ok()
            .filter(|&secs| secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// The string body, ignoring an empty one
    #[must_use]
    pub fn string_body(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Authentication {
    #[serde(default)]
    pub oauth2: OAuth2Config,
}

/// Client-credentials grant settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2Config {
    #[serde(default)]
    pub token_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !self.token_url.is_empty()
    }
}
