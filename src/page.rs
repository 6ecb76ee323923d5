//! Internal ownership of the secondary inbox page.
//!
//! [`SecondaryPage`] is the only holder of the page the extractor opens.
//! It closes the page exactly once: either through [`SecondaryPage::close`]
//! or, if the owner is dropped first (early return, panic, or the caller
//! dropping the extraction future), from `Drop` on the current tokio runtime.

use crate::address::InboxAddress;
use crate::browser::{bounded, BrowserContext, BrowserError, InboxPage, OriginPage, PageId};
use crate::config::TimeoutConfig;
use crate::error::{Error, PageStage, Result};
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub(crate) struct SecondaryPage {
    inner: Option<Box<dyn InboxPage>>,
    id: PageId,
    address_prefix: String,
    close_timeout: Duration,
}

impl SecondaryPage {
    /// Opens a new page in `context`, distinct from `origin`.
    #[instrument(
        name = "SecondaryPage::open",
        skip_all,
        fields(
            address_prefix = %address.prefix(),
            origin_page_id = %origin.id(),
            page_id
        )
    )]
    pub async fn open(
        context: &dyn BrowserContext,
        origin: &OriginPage,
        address: &InboxAddress,
        timeouts: &TimeoutConfig,
    ) -> Result<Self> {
        let page = bounded("open_page", timeouts.open_page, context.open_page())
            .await
            .map_err(|source| Error::TabLifecycle {
                address_prefix: address.prefix().to_string(),
                stage: PageStage::Open,
                source,
            })?;

        let id = page.id().clone();
        tracing::Span::current().record("page_id", tracing::field::display(&id));

        if &id == origin.id() {
            // Never close the caller's page; just drop our handle to it.
            return Err(Error::TabLifecycle {
                address_prefix: address.prefix().to_string(),
                stage: PageStage::OriginReuse,
                source: BrowserError::engine(format!(
                    "context returned the origin page {id} instead of a new page"
                )),
            });
        }

        debug!("Secondary page opened");

        Ok(Self {
            inner: Some(page),
            id,
            address_prefix: address.prefix().to_string(),
            close_timeout: timeouts.close,
        })
    }

    pub fn id(&self) -> &PageId {
        &self.id
    }

    /// Borrows the open page.
    pub fn page(&self) -> std::result::Result<&dyn InboxPage, BrowserError> {
        self.inner
            .as_deref()
            .ok_or_else(|| BrowserError::PageClosed {
                page: self.id.clone(),
            })
    }

    /// Wraps a browser failure at `stage` into a lifecycle error.
    pub fn lifecycle_error(&self, stage: PageStage, source: BrowserError) -> Error {
        Error::TabLifecycle {
            address_prefix: self.address_prefix.clone(),
            stage,
            source,
        }
    }

    /// Closes the page. Calling it on an already closed page is a no-op.
    ///
    /// The page stays owned until the close completes, so dropping this
    /// future mid-close still hands the page to the `Drop` path.
    #[instrument(name = "SecondaryPage::close", skip(self), fields(page_id = %self.id))]
    pub async fn close(mut self) -> Result<()> {
        let Some(page) = self.inner.as_deref() else {
            return Ok(());
        };

        let closed = bounded("close_page", self.close_timeout, page.close()).await;
        self.inner = None;

        match closed {
            Ok(()) => {
                debug!("Secondary page closed");
                Ok(())
            }
            Err(source) => Err(self.lifecycle_error(PageStage::Close, source)),
        }
    }
}

impl Drop for SecondaryPage {
    fn drop(&mut self) {
        if let Some(page) = self.inner.take() {
            let close_timeout = self.close_timeout;
            let page_id = self.id.clone();

            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        match bounded("close_page", close_timeout, page.close()).await {
                            Ok(()) => debug!(%page_id, "Secondary page closed on drop"),
                            Err(e) => warn!(%page_id, error = %e, "Secondary page close on drop failed"),
                        }
                    });
                }
                Err(_) => {
                    warn!(
                        %page_id,
                        "SecondaryPage dropped outside of tokio runtime context. \
                         The page handle is released without closing the tab."
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for SecondaryPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryPage")
            .field("id", &self.id)
            .field("address_prefix", &self.address_prefix)
            .field("open", &self.inner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingPage {
        id: PageId,
        closes: Arc<AtomicUsize>,
        attempts: Arc<AtomicUsize>,
        close_delay: Duration,
    }

    #[async_trait]
    impl InboxPage for CountingPage {
        fn id(&self) -> &PageId {
            &self.id
        }
        async fn navigate(&self, _url: &str) -> BrowserResult<()> {
            Ok(())
        }
        async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> BrowserResult<()> {
            Ok(())
        }
        async fn texts(&self, _selector: &str) -> BrowserResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn attributes(&self, _selector: &str, _name: &str) -> BrowserResult<Vec<Option<String>>> {
            Ok(Vec::new())
        }
        async fn click(&self, _selector: &str, _index: usize) -> BrowserResult<()> {
            Ok(())
        }
        async fn close(&self) -> BrowserResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if !self.close_delay.is_zero() {
                tokio::time::sleep(self.close_delay).await;
            }
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingContext {
        page_id: &'static str,
        closes: Arc<AtomicUsize>,
        attempts: Arc<AtomicUsize>,
        close_delay: Duration,
    }

    #[async_trait]
    impl BrowserContext for CountingContext {
        async fn open_page(&self) -> BrowserResult<Box<dyn InboxPage>> {
            Ok(Box::new(CountingPage {
                id: PageId::new(self.page_id),
                closes: Arc::clone(&self.closes),
                attempts: Arc::clone(&self.attempts),
                close_delay: self.close_delay,
            }))
        }
    }

    fn fixture(page_id: &'static str) -> (CountingContext, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        let context = CountingContext {
            page_id,
            closes: Arc::clone(&closes),
            attempts: Arc::new(AtomicUsize::new(0)),
            close_delay: Duration::ZERO,
        };
        (context, closes)
    }

    fn address() -> InboxAddress {
        InboxAddress::new("UserA123", "yopmail.com").unwrap()
    }

    #[tokio::test]
    async fn test_close_closes_once() {
        let (context, closes) = fixture("tab-1");
        let origin = OriginPage::new(PageId::new("origin"));

        let page = SecondaryPage::open(&context, &origin, &address(), &TimeoutConfig::default())
            .await
            .unwrap();
        assert_eq!(page.id().as_str(), "tab-1");
        page.close().await.unwrap();

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_closes_in_background() {
        let (context, closes) = fixture("tab-1");
        let origin = OriginPage::new(PageId::new("origin"));

        let page = SecondaryPage::open(&context, &origin, &address(), &TimeoutConfig::default())
            .await
            .unwrap();
        drop(page);
        tokio::task::yield_now().await;

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_close_is_finished_on_drop() {
        let (mut context, closes) = fixture("tab-1");
        context.close_delay = Duration::from_secs(1);
        let attempts = Arc::clone(&context.attempts);
        let origin = OriginPage::new(PageId::new("origin"));

        let page = SecondaryPage::open(&context, &origin, &address(), &TimeoutConfig::default())
            .await
            .unwrap();
        let cut = tokio::time::timeout(Duration::from_millis(100), page.close()).await;
        assert!(cut.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_origin_reuse_is_rejected_without_close() {
        let (context, closes) = fixture("origin");
        let origin = OriginPage::new(PageId::new("origin"));

        let err = SecondaryPage::open(&context, &origin, &address(), &TimeoutConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::TabLifecycle {
                stage: PageStage::OriginReuse,
                ..
            }
        ));
        tokio::task::yield_now().await;
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }
}
