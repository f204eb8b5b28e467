//! The session seam: state machine, operations trait, and factory trait.

use async_trait::async_trait;
use kiosko_common::{Article, ArticleStub, CapabilityDescriptor, Result, RunStatus};
use std::time::Duration;
use url::Url;

/// Lifecycle state of one browser session.
///
/// Transitions are monotonic: `Opening → Active → Reporting → Closed`, with
/// any failure during `Opening` jumping straight to `Failed`. No state is
/// revisited after `Closed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Active,
    Reporting,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    /// Move to `next` if the transition is forward; terminal states stick.
    pub fn advance(&mut self, next: SessionState) {
        if !self.is_terminal() {
            *self = next;
        }
    }
}

/// Operations one remote or local browser connection exposes.
///
/// The orchestrator owns each session exclusively; the extraction pipeline
/// borrows it for the duration of one run.
#[async_trait]
pub trait BrowserSession: Send {
    /// Provider-assigned opaque session id (or a local placeholder).
    fn id(&self) -> &str;

    fn state(&self) -> SessionState;

    /// Load a page and wait for it to reach a ready state within `timeout`.
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<()>;

    /// Read the current page and return at most `max` candidate article
    /// references (URL + title only). Does not follow links.
    async fn extract_listing(&mut self, max: usize) -> Result<Vec<ArticleStub>>;

    /// Navigate to the stub's URL and extract title, body, and image
    /// reference. Fails with an extraction error when required fields are
    /// absent; the caller decides whether to retry or skip.
    async fn extract_article(&mut self, stub: &ArticleStub) -> Result<Article>;

    /// One best-effort status update to the provider. Delivery failure is
    /// logged and swallowed; it must never fail the run.
    async fn report_status(&mut self, status: RunStatus, reason: &str);

    /// Release the underlying connection. Idempotent, safe on every exit
    /// path including earlier failures.
    async fn close(&mut self);
}

/// Opens sessions for capability descriptors.
///
/// Implementations must release any partially established connection before
/// returning an error, so `close` semantics hold on the open-failure path
/// too.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, descriptor: &CapabilityDescriptor) -> Result<Box<dyn BrowserSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_advance_forward() {
        let mut s = SessionState::Opening;
        s.advance(SessionState::Active);
        assert_eq!(s, SessionState::Active);
        s.advance(SessionState::Reporting);
        s.advance(SessionState::Closed);
        assert_eq!(s, SessionState::Closed);
    }

    #[test]
    fn terminal_states_stick() {
        let mut s = SessionState::Failed;
        s.advance(SessionState::Active);
        assert_eq!(s, SessionState::Failed);

        let mut s = SessionState::Closed;
        s.advance(SessionState::Reporting);
        assert_eq!(s, SessionState::Closed);
    }
}
