//! Minimal JSON HTTP client with retries and flexible auth.
//!
//! - Per-request options: timeout, retry budget, `Auth`
//! - Retries 429/5xx and network faults with exponential backoff, honoring
//!   `Retry-After`
//! - Structured `tracing` events for start/retry/error; secrets are never
//!   logged (only the auth kind is)
//!
//! ```no_run
//! # async fn demo() -> Result<(), kiosko_http::HttpError> {
//! let client = kiosko_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", kiosko_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// Authentication strategies supported by the client.
#[derive(Clone, Debug, Default)]
pub enum Auth {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// HTTP basic auth, used by the provider session REST API.
    Basic { username: String, password: String },
    /// Custom header (e.g. `X-RapidAPI-Key`).
    Header { name: &'static str, value: String },
    #[default]
    None,
}

impl Auth {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Basic { .. } => "basic",
            Auth::Header { .. } => "header",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs.
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Auth,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// GET and decode a JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: RequestOpts,
    ) -> Result<T, HttpError> {
        self.request_json::<(), T>(Method::GET, path, None, opts)
            .await
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B, opts: RequestOpts) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(body), opts)
            .await
    }

    /// PUT a JSON body and decode a JSON response. The provider status
    /// update is a PATCH-style call carried over PUT.
    pub async fn put_json<B, T>(&self, path: &str, body: &B, opts: RequestOpts) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::PUT, path, Some(body), opts).await
    }

    async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let mut attempt = 0usize;

        loop {
            let mut rb = self.inner.request(method.clone(), url.clone()).timeout(timeout);

            if let Some(b) = body {
                rb = rb.json(b);
            }
            rb = match &opts.auth {
                Auth::Bearer(tok) => rb.bearer_auth(tok.trim()),
                Auth::Basic { username, password } => rb.basic_auth(username, Some(password)),
                Auth::Header { name, value } => rb.header(*name, value),
                Auth::None => rb,
            };

            tracing::debug!(
                attempt = attempt + 1,
                max_retries,
                method = %method,
                host_path = %format!("{}{}", url.domain().unwrap_or("-"), url.path()),
                timeout_ms = timeout.as_millis() as u64,
                auth_kind = opts.auth.kind(),
                "http.request.start"
            );

            let resp = match rb.send().await {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            attempt,
                            backoff_ms = delay.as_millis() as u64,
                            error = %err,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    return Err(HttpError::Network(err.to_string()));
                }
            };

            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| HttpError::Network(e.to_string()))?;
            let snippet = snip_body(&bytes);

            if status.is_success() {
                return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                    tracing::warn!(error = %e, body_snippet = %snippet, "http.response.decode_error");
                    HttpError::Decode(e.to_string(), snippet)
                });
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < max_retries {
                attempt += 1;
                let delay = headers
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| backoff_delay(attempt));
                tracing::warn!(
                    %status,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    body_snippet = %snippet,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(%status, body_snippet = %snippet, "http.error");
            return Err(HttpError::Api {
                status,
                message: extract_error_message(&bytes),
            });
        }
    }
}

fn backoff_delay(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << (attempt - 1)))
}

fn extract_error_message(body: &[u8]) -> String {
    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(serde::Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        for candidate in [m.message, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        snip.truncate(500);
        snip.push_str("...");
    }
    snip
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn put_json_sends_basic_auth_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/automate/sessions/abc.json"))
            .and(header_exists("authorization"))
            .and(body_json(json!({"status": "passed", "reason": ""})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let opts = RequestOpts {
            auth: Auth::Basic {
                username: "user".into(),
                password: "key".into(),
            },
            ..Default::default()
        };
        let got: serde_json::Value = client
            .put_json(
                "automate/sessions/abc.json",
                &json!({"status": "passed", "reason": ""}),
                opts,
            )
            .await
            .unwrap();
        assert_eq!(got["ok"], json!(true));
    }

    #[tokio::test]
    async fn retries_on_500_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 1})))
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let got: serde_json::Value = client
            .get_json("flaky", RequestOpts::default())
            .await
            .unwrap();
        assert_eq!(got["v"], json!(1));
    }

    #[tokio::test]
    async fn surfaces_api_error_after_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/denied"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"message": "no access"})),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let err = client
            .get_json::<serde_json::Value>("denied", RequestOpts::default())
            .await
            .unwrap_err();
        match err {
            HttpError::Api { status, message } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "no access");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
