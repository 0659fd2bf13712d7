use super::oauth2::ClientCredentials;
use crate::Result;
use crate::metric::WebMetric;
use core::time::Duration;
use ohno::IntoAppError;
use reqwest::header::AUTHORIZATION;
use std::sync::{Arc, LazyLock};

const LOG_TARGET: &str = "      http";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Process-wide client with certificate verification disabled, shared by every
/// metric that asks for insecure TLS.
static INSECURE_TRANSPORT: LazyLock<Arc<reqwest::Client>> = LazyLock::new(|| {
    Arc::new(
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()
            .expect("unable to create insecure HTTP client"),
    )
});

/// HTTP client configured for one metric definition.
///
/// Holds no per-call state, so a single instance can serve concurrent measurements.
#[derive(Debug, Clone)]
pub struct WebClient {
    client: Arc<reqwest::Client>,
    timeout: Duration,
    oauth2: Option<Arc<ClientCredentials>>,
}

impl WebClient {
    /// Build the client for a web metric.
    ///
    /// Fails if the metric enables OAuth2 without a client ID or secret.
    pub fn from_metric(web: &WebMetric) -> Result<Self> {
        let client = if web.insecure {
            log::debug!(target: LOG_TARGET, "Using shared transport without certificate verification for '{}'", web.url);
            Arc::clone(&INSECURE_TRANSPORT)
        } else {
            Arc::new(
                reqwest::Client::builder()
                    .user_agent(USER_AGENT)
                    .build()
                    .into_app_err("creating HTTP client")?,
            )
        };

        let oauth2 = &web.authentication.oauth2;
        let oauth2 = if oauth2.is_enabled() {
            Some(Arc::new(ClientCredentials::new(oauth2)?))
        } else {
            None
        };

        Ok(Self {
            client,
            timeout: web.timeout(),
            oauth2,
        })
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn has_oauth2(&self) -> bool {
        self.oauth2.is_some()
    }

    /// Whether requests go through the shared transport that skips certificate verification
    #[must_use]
    pub fn is_insecure(&self) -> bool {
        Arc::ptr_eq(&self.client, &INSECURE_TRANSPORT)
    }

    /// Send a request, bounded by the configured timeout and authenticated when OAuth2 is set up
    pub async fn execute(&self, mut request: reqwest::Request) -> Result<reqwest::Response> {
        *request.timeout_mut() = Some(self.timeout);

        if let Some(oauth2) = &self.oauth2 {
            let value = oauth2.authorization(&self.client, self.timeout).await?;
            let _ = request.headers_mut().insert(AUTHORIZATION, value);
        }

        let method = request.method().clone();
        let url = request.url().clone();
        log::debug!(target: LOG_TARGET, "Sending {method} request to '{url}'");

        self.client
            .execute(request)
            .await
            .into_app_err_with(|| format!("sending {method} request to '{url}'"))
    }
}
