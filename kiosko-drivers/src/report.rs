//! Best-effort status reporting to the provider session API.

use kiosko_common::RunStatus;
use kiosko_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde_json::json;
use std::time::Duration;

/// Sends the final pass/fail verdict for a session to the provider REST API
/// (`PUT sessions/<id>.json` with `{status, reason}`, basic auth).
///
/// Reporting is fire-and-forget: without it the provider dashboard shows the
/// session as "unknown", but a delivery failure never fails the scrape run.
#[derive(Clone)]
pub struct StatusReporter {
    http: HttpClient,
    username: String,
    access_key: String,
}

impl StatusReporter {
    pub fn new(api_url: &str, username: &str, access_key: &str) -> Result<Self, HttpError> {
        Ok(Self {
            http: HttpClient::new(api_url)?.with_timeout(Duration::from_secs(10)),
            username: username.to_string(),
            access_key: access_key.to_string(),
        })
    }

    /// Deliver one status update. Errors are logged and swallowed.
    pub async fn report(&self, session_id: &str, status: RunStatus, reason: &str) {
        let body = json!({
            "status": status.as_provider_str(),
            "reason": reason,
        });
        let opts = RequestOpts {
            auth: Auth::Basic {
                username: self.username.clone(),
                password: self.access_key.clone(),
            },
            retries: Some(1),
            ..Default::default()
        };

        let path = format!("sessions/{session_id}.json");
        match self
            .http
            .put_json::<_, serde_json::Value>(&path, &body, opts)
            .await
        {
            Ok(_) => {
                tracing::debug!(session_id, status = status.as_provider_str(), "session status reported");
            }
            Err(err) => {
                tracing::warn!(session_id, error = %err, "status report delivery failed; continuing");
            }
        }
    }
}
