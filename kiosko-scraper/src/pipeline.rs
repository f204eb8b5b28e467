//! One session, one run: listing → per-article extraction → result.

use async_trait::async_trait;
use kiosko_common::{Article, CapabilityDescriptor, RunStatus, ScrapeRunResult};
use kiosko_drivers::session::BrowserSession;
use kiosko_translate::TranslationChain;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use url::Url;

/// Destination for article cover images. Failure to store is soft: the
/// pipeline records the article either way.
#[async_trait]
pub trait ImageSink: Send + Sync {
    async fn store(&self, article_id: &str, url: &Url) -> Option<PathBuf>;
}

/// Sink that stores nothing; used when image capture is disabled.
pub struct NoopImageSink;

#[async_trait]
impl ImageSink for NoopImageSink {
    async fn store(&self, _article_id: &str, _url: &Url) -> Option<PathBuf> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub listing_url: Url,
    pub max_articles: usize,
    /// Total attempts per article, including the first.
    pub retry_attempts: u32,
    /// Base delay between attempts; grows linearly with the attempt number.
    pub retry_backoff: Duration,
    pub navigation_timeout: Duration,
    pub target_lang: String,
}

impl PipelineConfig {
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff * attempt
    }
}

/// Run the extraction pipeline over an already opened session.
///
/// Never panics and never propagates an error: every outcome, including a
/// listing page that yields nothing, is folded into the returned
/// [`ScrapeRunResult`]. The run passes when at least one article survives.
pub async fn run(
    session: &mut dyn BrowserSession,
    descriptor: &CapabilityDescriptor,
    cfg: &PipelineConfig,
    translator: Option<&TranslationChain>,
    images: &dyn ImageSink,
) -> ScrapeRunResult {
    let started = Instant::now();
    let session_id = session.id().to_string();

    if let Err(e) = session
        .navigate(&cfg.listing_url, cfg.navigation_timeout)
        .await
    {
        tracing::error!(session = %session_id, error = %e, "listing navigation failed");
        return finish(
            session_id,
            descriptor,
            Vec::new(),
            vec![format!("listing navigation failed: {e}")],
            started,
        );
    }

    let stubs = match session.extract_listing(cfg.max_articles).await {
        Ok(stubs) if stubs.is_empty() => {
            tracing::warn!(session = %session_id, url = %cfg.listing_url, "listing page yielded no articles");
            return finish(
                session_id,
                descriptor,
                Vec::new(),
                vec!["empty listing".to_string()],
                started,
            );
        }
        Ok(stubs) => stubs,
        Err(e) => {
            tracing::error!(session = %session_id, error = %e, "listing extraction failed");
            return finish(
                session_id,
                descriptor,
                Vec::new(),
                vec![format!("listing extraction failed: {e}")],
                started,
            );
        }
    };

    tracing::info!(session = %session_id, candidates = stubs.len(), "listing extracted");

    let mut articles = Vec::new();
    let mut skips = Vec::new();

    for stub in &stubs {
        match extract_with_retry(session, cfg, stub).await {
            Ok(mut article) => {
                if let Some(chain) = translator {
                    match chain.translate(&article.title, &cfg.target_lang).await {
                        Ok(translated) => article.translated_title = Some(translated),
                        Err(e) => {
                            tracing::warn!(url = %stub.url, error = %e, "title translation failed; keeping original only");
                        }
                    }
                }
                if let Some(image_url) = article.image_url.clone() {
                    images.store(&article.id, &image_url).await;
                }
                articles.push(article);
            }
            Err(reason) => {
                tracing::warn!(url = %stub.url, %reason, "article skipped after retries");
                skips.push(reason);
            }
        }
    }

    finish(session_id, descriptor, articles, skips, started)
}

async fn extract_with_retry(
    session: &mut dyn BrowserSession,
    cfg: &PipelineConfig,
    stub: &kiosko_common::ArticleStub,
) -> Result<Article, String> {
    let attempts = cfg.retry_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match session.extract_article(stub).await {
            Ok(article) => return Ok(article),
            Err(e) => {
                last_error = e.to_string();
                if attempt < attempts {
                    let delay = cfg.backoff_for(attempt);
                    tracing::debug!(url = %stub.url, attempt, error = %last_error, ?delay, "extraction failed; retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(format!("{}: {last_error}", stub.url))
}

fn finish(
    session_id: String,
    descriptor: &CapabilityDescriptor,
    articles: Vec<Article>,
    skips: Vec<String>,
    started: Instant,
) -> ScrapeRunResult {
    let status = if articles.is_empty() {
        RunStatus::Failed
    } else {
        RunStatus::Passed
    };
    let error_detail = if skips.is_empty() {
        None
    } else {
        Some(skips.join("; "))
    };

    ScrapeRunResult {
        session_id,
        descriptor: descriptor.clone(),
        articles,
        status,
        error_detail,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}
