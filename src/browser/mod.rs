//! Document-session seam between the scraper and the browser automation backend.

pub mod webdriver;

#[cfg(test)]
pub mod fake;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScrapeError;

pub use webdriver::WebDriverFactory;

/// Opaque handle to an element in the live document. Only valid until the
/// next navigation or re-render; never cache one across navigations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// Where a query runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Root {
    /// Inside the shadow root attached to this host element.
    Shadow(ElementRef),
    /// Among the descendants of this element.
    Element(ElementRef),
}

/// A live, single-user document handle.
#[async_trait]
pub trait DocumentSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError>;

    async fn current_url(&self) -> Result<String, ScrapeError>;

    /// `document.readyState`
    async fn ready_state(&self) -> Result<String, ScrapeError>;

    /// First element with this tag name in the outer document.
    async fn find_host(&self, tag: &str) -> Result<Option<ElementRef>, ScrapeError>;

    async fn query(&self, root: &Root, selector: &str) -> Result<Option<ElementRef>, ScrapeError>;

    async fn query_all(&self, root: &Root, selector: &str) -> Result<Vec<ElementRef>, ScrapeError>;

    async fn text(&self, element: &ElementRef) -> Result<String, ScrapeError>;

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, ScrapeError>;

    /// Script-driven click, so overlays and scroll position never intercept it.
    async fn click(&self, element: &ElementRef) -> Result<(), ScrapeError>;

    /// Release the underlying browser. The session is unusable afterwards.
    async fn close(&self) -> Result<(), ScrapeError>;
}

/// Produces a fresh document session per cycle.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn DocumentSession>, ScrapeError>;
}

// ---------------------------------------------------------------------------
// Scope: "given a root, return a scoped query"
// ---------------------------------------------------------------------------

/// Query capability bound to one root. The extractor and enumerator only see
/// scopes, never the raw session API.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    session: &'a dyn DocumentSession,
    root: &'a Root,
}

impl<'a> Scope<'a> {
    pub fn new(session: &'a dyn DocumentSession, root: &'a Root) -> Self {
        Self { session, root }
    }

    pub async fn one(&self, selector: &str) -> Result<Option<ElementRef>, ScrapeError> {
        self.session.query(self.root, selector).await
    }

    pub async fn all(&self, selector: &str) -> Result<Vec<ElementRef>, ScrapeError> {
        self.session.query_all(self.root, selector).await
    }

    /// Trimmed text of the first match, `None` when nothing matches.
    pub async fn text_of(&self, selector: &str) -> Result<Option<String>, ScrapeError> {
        match self.one(selector).await? {
            Some(el) => Ok(Some(self.session.text(&el).await?.trim().to_string())),
            None => Ok(None),
        }
    }

    pub async fn attribute_of(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, ScrapeError> {
        match self.one(selector).await? {
            Some(el) => self.session.attribute(&el, name).await,
            None => Ok(None),
        }
    }

    pub fn session(&self) -> &'a dyn DocumentSession {
        self.session
    }
}

/// Resolve the shadow host and wrap it as a query root.
pub async fn shadow_root(
    session: &dyn DocumentSession,
    host_tag: &str,
) -> Result<Root, ScrapeError> {
    match session.find_host(host_tag).await? {
        Some(host) => Ok(Root::Shadow(host)),
        None => Err(ScrapeError::RootUnavailable(host_tag.to_string())),
    }
}

/// Poll `check` every `step` until it returns true or `timeout` elapses.
/// Returns whether the condition was met. Errors from `check` propagate.
pub async fn wait_until<F, Fut>(
    timeout: Duration,
    step: Duration,
    mut check: F,
) -> Result<bool, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, ScrapeError>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await? {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(step).await;
    }
}

/// Wait for the shadow host to appear on a freshly loaded page.
pub async fn wait_for_root(
    session: &dyn DocumentSession,
    host_tag: &str,
    timeout: Duration,
    step: Duration,
) -> Result<Root, ScrapeError> {
    let found = wait_until(timeout, step, move || async move {
        Ok(session.find_host(host_tag).await?.is_some())
    })
    .await?;
    if !found {
        return Err(ScrapeError::RootUnavailable(host_tag.to_string()));
    }
    shadow_root(session, host_tag).await
}
