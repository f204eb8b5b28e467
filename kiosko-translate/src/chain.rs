use crate::traits::{TranslationBackend, TranslationError};
use std::time::Duration;
use tokio::time::timeout;

/// Diagnostic record of one failed backend attempt. Transient: used for the
/// chain decision and logging only, never persisted.
#[derive(Debug, Clone)]
pub struct AttemptDiagnostic {
    pub backend: String,
    pub reason: String,
}

/// Returned only when every backend in the chain failed or timed out.
/// Callers must treat this as non-fatal to the containing article.
#[derive(Debug, thiserror::Error)]
#[error("all {count} translation backends failed for target '{target_lang}'", count = .attempts.len())]
pub struct TranslationFailure {
    pub target_lang: String,
    pub attempts: Vec<AttemptDiagnostic>,
}

/// Ordered list of translation backends; the first success short-circuits.
pub struct TranslationChain {
    backends: Vec<Box<dyn TranslationBackend>>,
    source_lang: String,
    attempt_timeout: Duration,
}

impl TranslationChain {
    pub fn new(
        backends: Vec<Box<dyn TranslationBackend>>,
        source_lang: impl Into<String>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            backends,
            source_lang: source_lang.into(),
            attempt_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Ordered backend names, for logging and tests.
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Try each backend in order, each bounded by its own timeout.
    pub async fn translate(
        &self,
        text: &str,
        target_lang: &str,
    ) -> Result<String, TranslationFailure> {
        let mut attempts = Vec::new();

        for backend in &self.backends {
            let outcome = timeout(
                self.attempt_timeout,
                backend.attempt(text, &self.source_lang, target_lang),
            )
            .await;

            let reason = match outcome {
                Ok(Ok(translated)) if !translated.trim().is_empty() => {
                    tracing::debug!(backend = backend.name(), "translation succeeded");
                    return Ok(translated);
                }
                Ok(Ok(_)) => TranslationError::Empty.to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(_) => TranslationError::Timeout(self.attempt_timeout).to_string(),
            };

            tracing::warn!(backend = backend.name(), %reason, "translation backend failed; trying next");
            attempts.push(AttemptDiagnostic {
                backend: backend.name().to_string(),
                reason,
            });
        }

        Err(TranslationFailure {
            target_lang: target_lang.to_string(),
            attempts,
        })
    }
}
