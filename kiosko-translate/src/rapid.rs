//! RapidAPI multi-translation backend. Paid; sits first in the chain when a
//! key is configured.

use crate::traits::{TranslationBackend, TranslationError};
use async_trait::async_trait;
use kiosko_http::{Auth, HttpClient, RequestOpts};
use serde::Serialize;

pub const RAPID_API_BASE: &str = "https://rapid-translate-multi-traduction.p.rapidapi.com/";

pub struct RapidTranslator {
    client: HttpClient,
    api_key: String,
}

#[derive(Serialize)]
struct RapidRequest<'a> {
    from: &'a str,
    to: &'a str,
    q: &'a str,
}

impl RapidTranslator {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, kiosko_http::HttpError> {
        Ok(Self {
            client: HttpClient::new(base_url)?,
            api_key,
        })
    }
}

#[async_trait]
impl TranslationBackend for RapidTranslator {
    fn name(&self) -> &str {
        "rapid-translate"
    }

    async fn attempt(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let req = RapidRequest {
            from: source_lang,
            to: target_lang,
            q: text,
        };
        let opts = RequestOpts {
            auth: Auth::Header {
                name: "X-RapidAPI-Key",
                value: self.api_key.clone(),
            },
            ..Default::default()
        };

        // The service answers with a JSON array of translated strings.
        let translated: Vec<String> = self
            .client
            .post_json("t", &req, opts)
            .await
            .map_err(|e| TranslationError::Backend(e.to_string()))?;

        translated
            .into_iter()
            .next()
            .filter(|t| !t.trim().is_empty())
            .ok_or(TranslationError::Empty)
    }
}
