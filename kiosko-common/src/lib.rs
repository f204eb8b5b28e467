//! Common types shared across the Kiosko workspace.
//!
//! This crate defines the domain models (capability descriptors, articles,
//! run results), the shared session error taxonomy, and the centralised
//! tracing initialisation. It is intentionally lightweight so every other
//! crate can depend on it without heavy transitive costs.
//!
//! # Overview
//!
//! - [`CapabilityDescriptor`]: one requested browser × OS combination
//! - [`Article`] / [`ArticleStub`]: extracted content and listing references
//! - [`ScrapeRunResult`] / [`RunStatus`]: per-session outcome
//! - [`SessionError`] and [`Result`]: shared error handling
//! - [`observability`]: rolling-file `tracing` setup

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub mod observability;

/// Provider-specific session flags recognised by the cloud grid.
///
/// This is a closed set: anything the provider would accept as a
/// `bstack:options` key but we do not model here is rejected at
/// configuration load time rather than forwarded untyped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderFlags {
    pub project: String,
    pub build: String,
    pub session_name: String,
    /// Physical device name for real-mobile sessions.
    pub device: Option<String>,
    pub real_mobile: Option<bool>,
    /// Desktop viewport, e.g. `1920x1080`.
    pub resolution: Option<String>,
    pub debug: bool,
    pub console_logs: String,
    pub network_logs: bool,
}

impl Default for ProviderFlags {
    fn default() -> Self {
        Self {
            project: "Kiosko Scraper".to_string(),
            build: "Kiosko Scraper Build".to_string(),
            session_name: String::new(),
            device: None,
            real_mobile: None,
            resolution: None,
            debug: true,
            console_logs: "info".to_string(),
            network_logs: true,
        }
    }
}

/// One browser/OS combination to run a scrape session on.
///
/// Immutable once built; construction is total, with unrecognised optional
/// fields falling back to the provider defaults in [`ProviderFlags`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub flags: ProviderFlags,
}

impl CapabilityDescriptor {
    /// Human-readable label used in logs and summaries.
    pub fn label(&self) -> String {
        match &self.flags.device {
            Some(device) => format!(
                "{} {} on {} {} ({device})",
                self.browser, self.browser_version, self.os, self.os_version
            ),
            None => format!(
                "{} {} on {} {}",
                self.browser, self.browser_version, self.os, self.os_version
            ),
        }
    }
}

/// Lightweight reference to a candidate article on a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleStub {
    pub url: Url,
    pub title: String,
}

/// A fully extracted article. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Derived deterministically from the canonical source URL; stable
    /// across runs against unchanged content.
    pub id: String,
    pub title: String,
    pub body_text: String,
    pub image_url: Option<Url>,
    pub translated_title: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub source_url: Url,
    pub scraped_at: DateTime<Utc>,
}

/// Derive a stable article identifier from the canonical form of `url`.
///
/// Query string and fragment are not part of the canonical identity, so two
/// scrapes of the same piece reached through different tracking parameters
/// yield the same id.
pub fn derive_article_id(url: &Url) -> String {
    let canonical = format!(
        "{}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.path()
    );
    blake3::hash(canonical.as_bytes()).to_hex()[..16].to_string()
}

/// Final pass/fail status of one session's run, as reported to the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
}

impl RunStatus {
    /// Wire value expected by the provider status endpoint.
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Outcome of one session: every requested descriptor produces exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRunResult {
    pub session_id: String,
    pub descriptor: CapabilityDescriptor,
    pub articles: Vec<Article>,
    pub status: RunStatus,
    pub error_detail: Option<String>,
    pub elapsed_ms: u64,
}

impl ScrapeRunResult {
    /// A failed result for a session that never produced articles.
    pub fn failed(
        session_id: impl Into<String>,
        descriptor: CapabilityDescriptor,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            descriptor,
            articles: Vec::new(),
            status: RunStatus::Failed,
            error_detail: Some(reason.into()),
            elapsed_ms: 0,
        }
    }
}

/// Error taxonomy for browser sessions.
///
/// Open/auth failures are fatal to their session only; navigation and
/// extraction failures are retried or skipped by the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// The provider or local driver could not be reached in time.
    #[error("connection error: {0}")]
    Connection(String),

    /// Credentials were rejected by the provider.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The page did not reach a ready state within the navigation timeout.
    #[error("navigation timed out after {0:?}")]
    NavigationTimeout(std::time::Duration),

    /// Any other driver-level navigation fault.
    #[error("navigation error: {0}")]
    Navigation(String),

    /// A required article field was absent on the page.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Catch-all for driver faults outside the categories above.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;
