//! Title translation with a fallback chain of backends.
//!
//! Backends are tried in a fixed order; the first non-empty success wins.
//! A chain where every backend fails reports a [`TranslationFailure`] that
//! callers treat as a degraded result, not a fatal one.

pub mod chain;
pub mod google;
pub mod rapid;
pub mod traits;

pub use chain::{AttemptDiagnostic, TranslationChain, TranslationFailure};
pub use google::{GoogleWebTranslator, GOOGLE_WEB_BASE};
pub use rapid::{RapidTranslator, RAPID_API_BASE};
pub use traits::{TranslationBackend, TranslationError};

use std::time::Duration;

/// Everything needed to assemble the default backend chain.
#[derive(Debug, Clone)]
pub struct ChainOptions {
    pub source_lang: String,
    pub rapid_api_key: Option<String>,
    pub attempt_timeout: Duration,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            source_lang: "es".to_string(),
            rapid_api_key: None,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Assemble the production chain: the keyed RapidAPI backend first when a key
/// is configured, then the free Google web endpoint as the fallback.
pub fn build_chain(opts: &ChainOptions) -> Result<TranslationChain, kiosko_http::HttpError> {
    let mut backends: Vec<Box<dyn TranslationBackend>> = Vec::new();

    if let Some(key) = opts.rapid_api_key.as_deref().filter(|k| !k.is_empty()) {
        backends.push(Box::new(RapidTranslator::new(
            RAPID_API_BASE,
            key.to_string(),
        )?));
    }
    backends.push(Box::new(GoogleWebTranslator::new(GOOGLE_WEB_BASE)?));

    tracing::info!(
        backends = ?backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
        "translation chain assembled"
    );

    Ok(TranslationChain::new(
        backends,
        opts.source_lang.clone(),
        opts.attempt_timeout,
    ))
}
