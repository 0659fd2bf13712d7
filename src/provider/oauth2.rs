//! OAuth2 client-credentials grant (RFC 6749 section 4.4)
//!
//! [`ClientCredentials`] fetches an access token from the configured token
//! endpoint and caches it until shortly before it expires. Requests that go
//! through a client carrying this layer get an `Authorization: Bearer` header.
//!
//! Client credentials are first sent with HTTP Basic authentication. When the
//! token endpoint rejects that, the request is repeated once with the
//! credentials in the form body, and whichever style worked is remembered.

use crate::Result;
use crate::metric::OAuth2Config;
use core::fmt;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{ACCEPT, HeaderValue};
use serde::Deserialize;
use std::time::Instant;
use tokio::sync::Mutex;

const LOG_TARGET: &str = "    oauth2";

/// A cached token is refreshed once it is this close to expiry.
const EXPIRY_DELTA: Duration = Duration::from_secs(10);

/// Characters escaped by `application/x-www-form-urlencoded`, apart from the space.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// How the client authenticates to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStyle {
    /// HTTP Basic with form-encoded client ID and secret
    Header,

    /// `client_id` and `client_secret` form parameters
    Params,
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<Token>,
    auth_style: Option<AuthStyle>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,

    #[serde(default)]
    token_type: String,

    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct Token {
    access_token: String,
    token_type: String,
    expires_at: Option<Instant>,
}

impl Token {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now + EXPIRY_DELTA < at)
    }

    /// Authorization scheme, normalizing the common spellings returned by token servers
    fn scheme(&self) -> &str {
        match self.token_type.to_ascii_lowercase().as_str() {
            "" | "bearer" => "Bearer",
            "mac" => "MAC",
            "basic" => "Basic",
            _ => &self.token_type,
        }
    }

    fn authorization(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("{} {}", self.scheme(), self.access_token))
            .into_app_err("building Authorization header from OAuth2 token")?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Token source for the client-credentials grant.
pub struct ClientCredentials {
    token_url: String,
    client_id: String,
    client_secret: String,
    scopes: Vec<String>,
    state: Mutex<TokenState>,
}

impl ClientCredentials {
    /// Create a token source, rejecting a configuration without client ID or secret
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            bail!("missing mandatory parameter in metric for OAuth2 setup");
        }

        Ok(Self {
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scopes: config.scopes.clone(),
            state: Mutex::new(TokenState::default()),
        })
    }

    /// Returns an `Authorization` header value, fetching a new token if the cached one is stale
    pub async fn authorization(&self, client: &reqwest::Client, timeout: Duration) -> Result<HeaderValue> {
        let mut state = self.state.lock().await;

        if let Some(token) = state.token.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return token.authorization();
        }

        let token = match state.auth_style {
            Some(style) => self.fetch_token(client, timeout, style).await?,
            None => {
                let (token, style) = match self.fetch_token(client, timeout, AuthStyle::Header).await {
                    Ok(token) => (token, AuthStyle::Header),
                    Err(e) => {
                        log::debug!(target: LOG_TARGET, "Basic client authentication failed, retrying with form credentials: {e}");
                        (self.fetch_token(client, timeout, AuthStyle::Params).await?, AuthStyle::Params)
                    }
                };
                state.auth_style = Some(style);
                token
            }
        };

        let value = token.authorization()?;
        state.token = Some(token);

        Ok(value)
    }

    async fn fetch_token(&self, client: &reqwest::Client, timeout: Duration, style: AuthStyle) -> Result<Token> {
        log::debug!(target: LOG_TARGET, "Requesting token from '{}'", self.token_url);

        let mut form = vec![("grant_type", "client_credentials".to_string())];
        if !self.scopes.is_empty() {
            form.push(("scope", self.scopes.join(" ")));
        }

        let mut request = client.post(&self.token_url);
        match style {
            AuthStyle::Header => {
                request = request.basic_auth(form_encode(&self.client_id), Some(form_encode(&self.client_secret)));
            }
            AuthStyle::Params => {
                form.push(("client_id", self.client_id.clone()));
                form.push(("client_secret", self.client_secret.clone()));
            }
        }

        let requested_at = Instant::now();
        let response = request
            .header(ACCEPT, "application/json")
            .form(&form)
            .timeout(timeout)
            .send()
            .await
            .into_app_err_with(|| format!("oauth2: sending token request to '{}'", self.token_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("oauth2: cannot fetch token: {status}; response: {body}");
        }

        let response: TokenResponse = response.json().await.into_app_err("oauth2: decoding token response")?;
        if response.access_token.is_empty() {
            bail!("oauth2: server response missing access_token");
        }

        log::info!(target: LOG_TARGET, "Acquired token from '{}'", self.token_url);

        Ok(Token {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at: response
                .expires_in
                .filter(|&secs| secs > 0)
                .map(|secs| requested_at + Duration::from_secs(secs)),
        })
    }
}

/// Encode a client credential for HTTP Basic authentication (RFC 6749 section 2.3.1)
fn form_encode(value: &str) -> String {
    utf8_percent_encode(value, FORM_ENCODE_SET).to_string().replace("%20", "+")
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}
