use async_trait::async_trait;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum TranslationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend returned an empty translation")]
    Empty,
}

/// One translation backend in the fallback chain.
///
/// Backends are strategies behind a uniform interface, tried in order by
/// [`crate::chain::TranslationChain`]; none of them is authoritative.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Translate `text` from `source_lang` into `target_lang`.
    async fn attempt(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError>;
}
