//! fantoccini-backed [`BrowserSession`] for remote grid or local driver use.

use crate::caps::{local_chrome_caps, to_webdriver_caps, Credentials};
use crate::report::StatusReporter;
use crate::session::{BrowserSession, SessionFactory, SessionState};
use async_trait::async_trait;
use chrono::Utc;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use kiosko_common::{
    derive_article_id, Article, ArticleStub, CapabilityDescriptor, Result, RunStatus, SessionError,
};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;
use uuid::Uuid;

/// Listing anchors for the opinion section, most specific first.
const LISTING_SELECTORS: &[&str] = &[
    "article a[href*='/opinion/']",
    ".articulo-titulo a",
    "h2 a[href*='/opinion/']",
    ".story a[href*='/opinion/']",
];

const TITLE_SELECTORS: &[&str] = &[
    "h1",
    ".articulo-titulo",
    "[data-dtm-region='articulo_titulo']",
    ".headline",
    "header h1",
];

const BODY_SELECTORS: &[&str] = &[
    ".articulo-cuerpo",
    ".article-body",
    "[data-dtm-region='articulo_cuerpo']",
    ".a_c p",
];

const IMAGE_SELECTORS: &[&str] = &[
    ".articulo-imagen img",
    ".a_m img",
    "figure img",
    ".article-image img",
];

/// Paragraphs shorter than this are treated as chrome, not body text.
const MIN_TEXT_LEN: usize = 50;

/// Connection parameters shared by every session the factory opens.
#[derive(Clone)]
pub struct DriverConfig {
    /// Provider hub or local chromedriver endpoint.
    pub webdriver_url: String,
    /// Present for cloud sessions; absent means a local chrome session.
    pub credentials: Option<Credentials>,
    pub connect_timeout: Duration,
    pub navigation_timeout: Duration,
    pub base_url: Url,
    /// Local sessions only; the grid controls its own display.
    pub headless: bool,
    pub reporter: Option<StatusReporter>,
}

pub struct RemoteSessionFactory {
    config: DriverConfig,
}

impl RemoteSessionFactory {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for RemoteSessionFactory {
    async fn open(&self, descriptor: &CapabilityDescriptor) -> Result<Box<dyn BrowserSession>> {
        let caps = match &self.config.credentials {
            Some(creds) => to_webdriver_caps(descriptor, Some(creds)),
            None => local_chrome_caps(self.config.headless),
        };

        tracing::info!(label = %descriptor.label(), "opening browser session");

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);
        let connect = builder.connect(&self.config.webdriver_url);
        let client = match timeout(self.config.connect_timeout, connect).await {
            Err(_) => {
                return Err(SessionError::Connection(format!(
                    "no session within {:?}",
                    self.config.connect_timeout
                )))
            }
            Ok(Err(e)) => return Err(classify_open_error(e)),
            Ok(Ok(client)) => client,
        };

        let id = match client.session_id().await {
            Ok(Some(id)) => id,
            _ => format!("local-{}", Uuid::new_v4()),
        };
        tracing::info!(session_id = %id, "session active");

        Ok(Box::new(RemoteSession {
            id,
            state: SessionState::Active,
            client: Some(client),
            navigation_timeout: self.config.navigation_timeout,
            base_url: self.config.base_url.clone(),
            reporter: self.config.reporter.clone(),
        }))
    }
}

/// One live WebDriver connection. Owned by the orchestrator; borrowed by the
/// extraction pipeline for a single run.
pub struct RemoteSession {
    id: String,
    state: SessionState,
    client: Option<Client>,
    navigation_timeout: Duration,
    base_url: Url,
    reporter: Option<StatusReporter>,
}

impl RemoteSession {
    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| SessionError::Navigation("session already closed".into()))
    }

    /// Placeholder ids are minted locally; the provider cannot key on them.
    fn has_provider_id(&self) -> bool {
        !self.id.starts_with("local-")
    }

    async fn find_first_text(&self, selectors: &[&str]) -> Result<Option<String>> {
        let client = self.client()?;
        for selector in selectors {
            if let Ok(element) = client.find(Locator::Css(selector)).await {
                let text = element.text().await.map_err(cmd_err)?;
                let text = clean_text(&text);
                if !text.is_empty() {
                    return Ok(Some(text));
                }
            }
        }
        Ok(None)
    }

    async fn extract_body(&self) -> Result<String> {
        let client = self.client()?;
        for selector in BODY_SELECTORS {
            if let Ok(elements) = client.find_all(Locator::Css(selector)).await {
                let mut parts = Vec::new();
                for element in elements {
                    let text = clean_text(&element.text().await.map_err(cmd_err)?);
                    if text.len() > MIN_TEXT_LEN {
                        parts.push(text);
                    }
                }
                if !parts.is_empty() {
                    return Ok(parts.join(" "));
                }
            }
        }

        // Last resort: plain paragraphs.
        let mut parts = Vec::new();
        if let Ok(paragraphs) = client.find_all(Locator::Css("p")).await {
            for p in paragraphs {
                let text = clean_text(&p.text().await.map_err(cmd_err)?);
                if text.len() > MIN_TEXT_LEN {
                    parts.push(text);
                }
            }
        }
        Ok(parts.join(" "))
    }

    async fn extract_image_url(&self) -> Result<Option<Url>> {
        let client = self.client()?;
        for selector in IMAGE_SELECTORS {
            if let Ok(element) = client.find(Locator::Css(selector)).await {
                if let Some(src) = element.attr("src").await.map_err(cmd_err)? {
                    if let Some(url) = normalize_image_url(&self.base_url, &src) {
                        return Ok(Some(url));
                    }
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BrowserSession for RemoteSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> SessionState {
        self.state
    }

    async fn navigate(&mut self, url: &Url, nav_timeout: Duration) -> Result<()> {
        let client = self.client()?;
        match timeout(nav_timeout, client.goto(url.as_str())).await {
            Err(_) => return Err(SessionError::NavigationTimeout(nav_timeout)),
            Ok(Err(e)) => return Err(nav_err(e, nav_timeout)),
            Ok(Ok(())) => {}
        }
        // Readiness: the document body must be present before extraction.
        client
            .wait()
            .at_most(nav_timeout)
            .for_element(Locator::Css("body"))
            .await
            .map_err(|e| nav_err(e, nav_timeout))?;
        Ok(())
    }

    async fn extract_listing(&mut self, max: usize) -> Result<Vec<ArticleStub>> {
        let client = self.client()?;
        let mut stubs: Vec<ArticleStub> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for selector in LISTING_SELECTORS {
            let elements = match client.find_all(Locator::Css(selector)).await {
                Ok(elements) => elements,
                Err(_) => continue,
            };
            for element in elements {
                let Some(href) = element.attr("href").await.map_err(cmd_err)? else {
                    continue;
                };
                let Some(url) = resolve_url(&self.base_url, &href) else {
                    continue;
                };
                if !seen.insert(url.as_str().to_string()) {
                    continue;
                }
                let title = clean_text(&element.text().await.map_err(cmd_err)?);
                stubs.push(ArticleStub { url, title });
                if stubs.len() >= max {
                    return Ok(stubs);
                }
            }
        }

        tracing::info!(count = stubs.len(), "listing extracted");
        Ok(stubs)
    }

    async fn extract_article(&mut self, stub: &ArticleStub) -> Result<Article> {
        let nav_timeout = self.navigation_timeout;
        self.navigate(&stub.url, nav_timeout).await?;

        // Title presence doubles as the article-ready signal.
        self.client()?
            .wait()
            .at_most(nav_timeout)
            .for_element(Locator::Css(
                "h1, .articulo-titulo, [data-dtm-region='articulo_titulo']",
            ))
            .await
            .map_err(|e| nav_err(e, nav_timeout))?;

        let title = self
            .find_first_text(TITLE_SELECTORS)
            .await?
            .ok_or_else(|| SessionError::Extraction(format!("no title found at {}", stub.url)))?;

        let body_text = self.extract_body().await?;
        if body_text.is_empty() {
            return Err(SessionError::Extraction(format!(
                "no body text found at {}",
                stub.url
            )));
        }

        let image_url = self.extract_image_url().await?;

        Ok(Article {
            id: derive_article_id(&stub.url),
            title,
            body_text,
            image_url,
            translated_title: None,
            keywords: None,
            source_url: stub.url.clone(),
            scraped_at: Utc::now(),
        })
    }

    async fn report_status(&mut self, status: RunStatus, reason: &str) {
        self.state.advance(SessionState::Reporting);
        match &self.reporter {
            Some(reporter) if self.has_provider_id() => {
                reporter.report(&self.id, status, reason).await;
            }
            _ => {
                tracing::debug!(session_id = %self.id, "no provider reporter; status not sent");
            }
        }
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(e) = client.close().await {
                tracing::warn!(session_id = %self.id, error = %e, "error closing session");
            } else {
                tracing::info!(session_id = %self.id, "session closed");
            }
        }
        self.state.advance(SessionState::Closed);
    }
}

fn classify_open_error(e: fantoccini::error::NewSessionError) -> SessionError {
    let msg = e.to_string();
    let lowered = msg.to_lowercase();
    if lowered.contains("auth") || lowered.contains("401") || lowered.contains("unauthorized") {
        SessionError::Auth(msg)
    } else {
        SessionError::Connection(msg)
    }
}

fn cmd_err(e: CmdError) -> SessionError {
    SessionError::Navigation(e.to_string())
}

fn nav_err(e: CmdError, nav_timeout: Duration) -> SessionError {
    match e {
        CmdError::WaitTimeout => SessionError::NavigationTimeout(nav_timeout),
        other => SessionError::Navigation(other.to_string()),
    }
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    match Url::parse(href) {
        Ok(url) if url.scheme().starts_with("http") => Some(url),
        Ok(_) => None,
        Err(_) => base.join(href).ok(),
    }
}

fn normalize_image_url(base: &Url, src: &str) -> Option<Url> {
    let absolute = if let Some(rest) = src.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        src.to_string()
    };
    let url = resolve_url(base, &absolute)?;
    is_image_path(url.path()).then_some(url)
}

fn is_image_path(path: &str) -> bool {
    let lowered = path.to_lowercase();
    [".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"]
        .iter()
        .any(|ext| lowered.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://elpais.com").unwrap()
    }

    #[test]
    fn relative_hrefs_resolve_against_base() {
        let url = resolve_url(&base(), "/opinion/pieza.html").unwrap();
        assert_eq!(url.as_str(), "https://elpais.com/opinion/pieza.html");
    }

    #[test]
    fn non_http_schemes_are_dropped() {
        assert!(resolve_url(&base(), "javascript:void(0)").is_none());
        assert!(resolve_url(&base(), "mailto:opinion@elpais.com").is_none());
    }

    #[test]
    fn scheme_relative_images_get_https() {
        let url = normalize_image_url(&base(), "//img.elpais.com/foto.jpg").unwrap();
        assert_eq!(url.as_str(), "https://img.elpais.com/foto.jpg");
    }

    #[test]
    fn non_image_paths_are_rejected() {
        assert!(normalize_image_url(&base(), "/opinion/pieza.html").is_none());
        assert!(normalize_image_url(&base(), "/fotos/portada.webp").is_some());
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  una \n\t columna  de  opinión "), "una columna de opinión");
    }
}
