//! Browser capabilities consumed by the extractor.
//!
//! The extractor does not drive a browser directly. It is handed a
//! [`BrowserContext`] that can open new pages, and it only ever talks to the
//! pages it opened itself through the [`InboxPage`] capability set
//! (`navigate`, `wait_for_selector`, `texts`, `click`, `close`).
//!
//! The caller's own page is represented by an [`OriginPage`]: an opaque,
//! read-only handle. Nothing in this crate can navigate or mutate it.
//!
//! # Implementing a backend
//!
//! ```
//! use async_trait::async_trait;
//! use mfa_extractor::browser::{BrowserContext, BrowserResult, InboxPage, PageId};
//! use std::time::Duration;
//!
//! struct NullPage(PageId);
//!
//! #[async_trait]
//! impl InboxPage for NullPage {
//!     fn id(&self) -> &PageId { &self.0 }
//!     async fn navigate(&self, _url: &str) -> BrowserResult<()> { Ok(()) }
//!     async fn wait_for_selector(&self, _s: &str, _t: Duration) -> BrowserResult<()> { Ok(()) }
//!     async fn texts(&self, _s: &str) -> BrowserResult<Vec<String>> { Ok(Vec::new()) }
//!     async fn attributes(&self, _s: &str, _n: &str) -> BrowserResult<Vec<Option<String>>> {
//!         Ok(Vec::new())
//!     }
//!     async fn click(&self, _s: &str, _i: usize) -> BrowserResult<()> { Ok(()) }
//!     async fn close(&self) -> BrowserResult<()> { Ok(()) }
//! }
//!
//! struct NullContext;
//!
//! #[async_trait]
//! impl BrowserContext for NullContext {
//!     async fn open_page(&self) -> BrowserResult<Box<dyn InboxPage>> {
//!         Ok(Box::new(NullPage(PageId::new("null"))))
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Result type for browser capability calls.
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Failures reported by a browser backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BrowserError {
    /// A selector did not appear before its wait expired.
    #[error("selector '{selector}' did not appear within {timeout:?}")]
    SelectorTimeout {
        /// The CSS selector that was awaited.
        selector: String,
        /// The wait that was exceeded.
        timeout: Duration,
    },

    /// No element matched a selector that had to be present.
    #[error("no element matches selector '{selector}'")]
    ElementNotFound {
        /// The CSS selector.
        selector: String,
    },

    /// A browser operation did not complete in time.
    #[error("browser operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        /// Name of the operation, e.g. `navigate`.
        operation: &'static str,
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The page was already closed.
    #[error("page {page} is closed")]
    PageClosed {
        /// The closed page.
        page: PageId,
    },

    /// Any other failure reported by the automation engine.
    #[error("browser engine error: {message}")]
    Engine {
        /// Engine-provided description.
        message: String,
    },
}

impl BrowserError {
    /// Wraps an engine error message.
    pub fn engine(message: impl fmt::Display) -> Self {
        BrowserError::Engine {
            message: message.to_string(),
        }
    }
}

/// Identifier of a browser page (tab / target).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId(String);

impl PageId {
    /// Creates a page identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only handle to the caller's active page.
///
/// Only the identifier is kept, so the extractor can tell its own secondary
/// page apart from the page driving the onboarding form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPage {
    id: PageId,
    label: Option<String>,
}

impl OriginPage {
    /// Creates a handle for the page with the given id.
    pub fn new(id: PageId) -> Self {
        Self { id, label: None }
    }

    /// Attaches a human-readable label used in logs, e.g. `"onboarding"`.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the page id.
    #[must_use]
    pub fn id(&self) -> &PageId {
        &self.id
    }

    /// Returns the label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// A shared browsing context (session / cookie jar) able to open pages.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Opens a new, blank page in this context.
    async fn open_page(&self) -> BrowserResult<Box<dyn InboxPage>>;
}

/// Capabilities the extractor needs from a page it owns.
///
/// Selectors are CSS selectors. Backends are expected to look into
/// same-origin iframes as well, since disposable inboxes usually render the
/// listing and the message body in frames.
#[async_trait]
pub trait InboxPage: Send + Sync {
    /// Returns this page's id.
    fn id(&self) -> &PageId;

    /// Navigates to `url` and waits for the load to finish.
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    /// Waits until at least one element matches `selector`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// Returns the rendered text of every element matching `selector`, in
    /// document order. An empty vector means nothing matched.
    async fn texts(&self, selector: &str) -> BrowserResult<Vec<String>>;

    /// Returns attribute `name` for every element matching `selector`.
    async fn attributes(&self, selector: &str, name: &str) -> BrowserResult<Vec<Option<String>>>;

    /// Clicks the `index`-th element matching `selector`.
    async fn click(&self, selector: &str, index: usize) -> BrowserResult<()>;

    /// Closes the page.
    async fn close(&self) -> BrowserResult<()>;

    /// Returns the text of the first element matching `selector`.
    async fn text(&self, selector: &str) -> BrowserResult<String> {
        self.texts(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })
    }
}

/// Runs a browser call under a timeout.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    timeout: Duration,
    call: F,
) -> BrowserResult<T>
where
    F: Future<Output = BrowserResult<T>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| BrowserError::Timeout { operation, timeout })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_page_label() {
        let origin = OriginPage::new(PageId::new("tab-1")).with_label("onboarding");
        assert_eq!(origin.id().as_str(), "tab-1");
        assert_eq!(origin.label(), Some("onboarding"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result: BrowserResult<()> = bounded("navigate", Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(BrowserError::Timeout {
                operation: "navigate",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let result = bounded("texts", Duration::from_secs(1), async { Ok(vec![1, 2]) }).await;
        assert_eq!(result.unwrap(), vec![1, 2]);
    }
}
