use async_trait::async_trait;
use kiosko_common::{
    derive_article_id, Article, ArticleStub, CapabilityDescriptor, ProviderFlags, Result,
    RunStatus, SessionError,
};
use kiosko_drivers::session::{BrowserSession, SessionState};
use kiosko_scraper::pipeline::{run, NoopImageSink, PipelineConfig};
use kiosko_translate::{TranslationBackend, TranslationChain, TranslationError};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

struct FakeSession {
    id: String,
    stubs: Vec<ArticleStub>,
    /// Remaining extraction failures per article URL.
    failures: HashMap<String, u32>,
    fail_navigation: bool,
}

impl FakeSession {
    fn new(stubs: Vec<ArticleStub>) -> Self {
        Self {
            id: "fake-session-1".to_string(),
            stubs,
            failures: HashMap::new(),
            fail_navigation: false,
        }
    }

    fn failing_first(mut self, url: &str, times: u32) -> Self {
        self.failures.insert(url.to_string(), times);
        self
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> SessionState {
        SessionState::Active
    }

    async fn navigate(&mut self, _url: &Url, _timeout: Duration) -> Result<()> {
        if self.fail_navigation {
            Err(SessionError::Navigation("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }

    async fn extract_listing(&mut self, max: usize) -> Result<Vec<ArticleStub>> {
        Ok(self.stubs.iter().take(max).cloned().collect())
    }

    async fn extract_article(&mut self, stub: &ArticleStub) -> Result<Article> {
        if let Some(left) = self.failures.get_mut(stub.url.as_str()) {
            if *left > 0 {
                *left -= 1;
                return Err(SessionError::Extraction(format!(
                    "no body text found at {}",
                    stub.url
                )));
            }
        }
        Ok(Article {
            id: derive_article_id(&stub.url),
            title: stub.title.clone(),
            body_text: "cuerpo del artículo de prueba".to_string(),
            image_url: None,
            translated_title: None,
            keywords: None,
            source_url: stub.url.clone(),
            scraped_at: chrono::Utc::now(),
        })
    }

    async fn report_status(&mut self, _status: RunStatus, _reason: &str) {}

    async fn close(&mut self) {}
}

struct EchoBackend;

#[async_trait]
impl TranslationBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    async fn attempt(
        &self,
        text: &str,
        _: &str,
        tl: &str,
    ) -> std::result::Result<String, TranslationError> {
        Ok(format!("[{tl}] {text}"))
    }
}

struct BrokenBackend;

#[async_trait]
impl TranslationBackend for BrokenBackend {
    fn name(&self) -> &str {
        "broken"
    }

    async fn attempt(
        &self,
        _: &str,
        _: &str,
        _: &str,
    ) -> std::result::Result<String, TranslationError> {
        Err(TranslationError::Backend("scripted failure".to_string()))
    }
}

fn stub(url: &str, title: &str) -> ArticleStub {
    ArticleStub {
        url: Url::parse(url).unwrap(),
        title: title.to_string(),
    }
}

fn descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor {
        browser: "Chrome".into(),
        browser_version: "latest".into(),
        os: "Windows".into(),
        os_version: "11".into(),
        flags: ProviderFlags::default(),
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        listing_url: Url::parse("https://elpais.com/opinion/").unwrap(),
        max_articles: 5,
        retry_attempts: 2,
        retry_backoff: Duration::ZERO,
        navigation_timeout: Duration::from_secs(10),
        target_lang: "en".to_string(),
    }
}

#[tokio::test]
async fn retries_recover_a_flaky_article_within_budget() {
    // Fails twice, succeeds on the third attempt; budget of three covers it.
    let mut cfg = config();
    cfg.retry_attempts = 3;
    let mut session = FakeSession::new(vec![
        stub("https://elpais.com/opinion/uno.html", "Primer artículo"),
        stub("https://elpais.com/opinion/dos.html", "Segundo artículo"),
    ])
    .failing_first("https://elpais.com/opinion/uno.html", 2);

    let result = run(&mut session, &descriptor(), &cfg, None, &NoopImageSink).await;

    assert_eq!(result.status, RunStatus::Passed);
    assert_eq!(result.articles.len(), 2);
    assert!(result.error_detail.is_none());
}

#[tokio::test]
async fn exhausted_retries_skip_the_article_but_not_the_run() {
    // Same failure pattern, but a budget of two gives up before recovery.
    let mut session = FakeSession::new(vec![
        stub("https://elpais.com/opinion/uno.html", "Primer artículo"),
        stub("https://elpais.com/opinion/dos.html", "Segundo artículo"),
    ])
    .failing_first("https://elpais.com/opinion/uno.html", 2);

    let result = run(&mut session, &descriptor(), &config(), None, &NoopImageSink).await;

    assert_eq!(result.status, RunStatus::Passed);
    assert_eq!(result.articles.len(), 1);
    assert_eq!(result.articles[0].title, "Segundo artículo");
    let detail = result.error_detail.unwrap();
    assert!(detail.contains("uno.html"));
    assert!(detail.contains("no body text"));
}

#[tokio::test]
async fn empty_listing_fails_the_run() {
    let mut session = FakeSession::new(Vec::new());

    let result = run(&mut session, &descriptor(), &config(), None, &NoopImageSink).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.articles.is_empty());
    assert_eq!(result.error_detail.as_deref(), Some("empty listing"));
}

#[tokio::test]
async fn navigation_failure_fails_the_run() {
    let mut session = FakeSession::new(vec![stub(
        "https://elpais.com/opinion/uno.html",
        "Primer artículo",
    )]);
    session.fail_navigation = true;

    let result = run(&mut session, &descriptor(), &config(), None, &NoopImageSink).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result
        .error_detail
        .unwrap()
        .contains("listing navigation failed"));
}

#[tokio::test]
async fn titles_are_translated_when_a_chain_is_given() {
    let mut session = FakeSession::new(vec![stub(
        "https://elpais.com/opinion/uno.html",
        "Primer artículo",
    )]);
    let chain = TranslationChain::new(vec![Box::new(EchoBackend)], "es", Duration::from_secs(5));

    let result = run(
        &mut session,
        &descriptor(),
        &config(),
        Some(&chain),
        &NoopImageSink,
    )
    .await;

    assert_eq!(
        result.articles[0].translated_title.as_deref(),
        Some("[en] Primer artículo")
    );
}

#[tokio::test]
async fn translation_failure_keeps_the_article() {
    let mut session = FakeSession::new(vec![stub(
        "https://elpais.com/opinion/uno.html",
        "Primer artículo",
    )]);
    let chain = TranslationChain::new(vec![Box::new(BrokenBackend)], "es", Duration::from_secs(5));

    let result = run(
        &mut session,
        &descriptor(),
        &config(),
        Some(&chain),
        &NoopImageSink,
    )
    .await;

    assert_eq!(result.status, RunStatus::Passed);
    assert!(result.articles[0].translated_title.is_none());
}

#[tokio::test]
async fn article_ids_are_stable_across_runs() {
    let stubs = vec![stub("https://elpais.com/opinion/uno.html", "Primer")];

    let mut first = FakeSession::new(stubs.clone());
    let mut second = FakeSession::new(stubs);

    let a = run(&mut first, &descriptor(), &config(), None, &NoopImageSink).await;
    let b = run(&mut second, &descriptor(), &config(), None, &NoopImageSink).await;

    assert_eq!(a.articles[0].id, b.articles[0].id);
}

#[tokio::test]
async fn listing_is_capped_at_max_articles() {
    let mut cfg = config();
    cfg.max_articles = 2;
    let mut session = FakeSession::new(vec![
        stub("https://elpais.com/opinion/uno.html", "Uno"),
        stub("https://elpais.com/opinion/dos.html", "Dos"),
        stub("https://elpais.com/opinion/tres.html", "Tres"),
    ]);

    let result = run(&mut session, &descriptor(), &cfg, None, &NoopImageSink).await;

    assert_eq!(result.articles.len(), 2);
}
