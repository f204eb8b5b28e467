//! Free Google web translation backend. No key required; serves as the
//! fallback when the paid backend is unavailable or unconfigured.

use crate::traits::{TranslationBackend, TranslationError};
use async_trait::async_trait;
use kiosko_http::{HttpClient, RequestOpts};
use serde_json::Value;

pub const GOOGLE_WEB_BASE: &str = "https://translate.googleapis.com/";

pub struct GoogleWebTranslator {
    client: HttpClient,
}

impl GoogleWebTranslator {
    pub fn new(base_url: &str) -> Result<Self, kiosko_http::HttpError> {
        Ok(Self {
            client: HttpClient::new(base_url)?,
        })
    }
}

#[async_trait]
impl TranslationBackend for GoogleWebTranslator {
    fn name(&self) -> &str {
        "google-web"
    }

    async fn attempt(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client", "gtx")
            .append_pair("sl", source_lang)
            .append_pair("tl", target_lang)
            .append_pair("dt", "t")
            .append_pair("q", text)
            .finish();
        let path = format!("translate_a/single?{query}");

        let raw: Value = self
            .client
            .get_json(&path, RequestOpts::default())
            .await
            .map_err(|e| TranslationError::Backend(e.to_string()))?;

        let translated = join_segments(&raw);
        if translated.trim().is_empty() {
            return Err(TranslationError::Empty);
        }
        Ok(translated)
    }
}

/// The endpoint answers `[[[translated, original, ...], ...], ...]`; the
/// full translation is the concatenation of the first field of each segment.
fn join_segments(raw: &Value) -> String {
    raw.get(0)
        .and_then(Value::as_array)
        .map(|segments| {
            segments
                .iter()
                .filter_map(|seg| seg.get(0).and_then(Value::as_str))
                .collect::<Vec<_>>()
                .concat()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_multiple_segments() {
        let raw = json!([
            [
                ["The future ", "El futuro ", null],
                ["of Europe", "de Europa", null]
            ],
            null,
            "es"
        ]);
        assert_eq!(join_segments(&raw), "The future of Europe");
    }

    #[test]
    fn malformed_payload_yields_empty() {
        assert_eq!(join_segments(&json!({"odd": true})), "");
        assert_eq!(join_segments(&json!([])), "");
    }
}
