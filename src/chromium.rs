//! `chromiumoxide` backend for the browser capability traits.
//!
//! [`ChromiumContext`] owns a launched browser and its CDP handler task. All
//! pages it opens share the browser's default context, so the inbox page sees
//! the same cookies and session as the onboarding page.
//!
//! Element queries run as page scripts that also descend into same-origin
//! iframes, which is where disposable inboxes render the listing and the
//! message body.
//!
//! ```no_run
//! use mfa_extractor::chromium::ChromiumContext;
//! use mfa_extractor::{ExtractorConfig, MfaExtractor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = ChromiumContext::launch_headless().await?;
//! let (form_page, origin) = context.origin_page("https://onboarding.example/signup").await?;
//!
//! let extractor = MfaExtractor::new(ExtractorConfig::builder().build()?);
//! let address = extractor.generate_address()?;
//! // ... fill `address.as_email()` into `form_page` and submit ...
//! let code = extractor.extract_code(&context, &origin, address.prefix()).await?;
//! # let _ = (form_page, code);
//! # Ok(())
//! # }
//! ```

use crate::browser::{BrowserContext, BrowserError, BrowserResult, InboxPage, OriginPage, PageId};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// Interval between checks in [`InboxPage::wait_for_selector`].
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A launched Chromium browser usable as a [`BrowserContext`].
pub struct ChromiumContext {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

impl ChromiumContext {
    /// Launches a browser with `config` and starts its CDP handler.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Engine`] if the browser cannot be launched.
    pub async fn launch(config: BrowserConfig) -> BrowserResult<Self> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(BrowserError::engine)?;
        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

        debug!("Chromium launched");

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Launches a headless browser with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Engine`] if the browser cannot be launched.
    pub async fn launch_headless() -> BrowserResult<Self> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .build()
            .map_err(BrowserError::engine)?;
        Self::launch(config).await
    }

    /// Returns the underlying browser.
    #[must_use]
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Opens the page that drives the flow under test and returns it with
    /// its read-only [`OriginPage`] handle.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Engine`] if the page cannot be opened.
    pub async fn origin_page(&self, url: &str) -> BrowserResult<(Page, OriginPage)> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(BrowserError::engine)?;
        let origin = OriginPage::new(page_id(&page));
        Ok((page, origin))
    }
}

impl std::fmt::Debug for ChromiumContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumContext")
            .field("handler_running", &!self.handler_task.is_finished())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    #[instrument(name = "chromium::open_page", skip(self))]
    async fn open_page(&self) -> BrowserResult<Box<dyn InboxPage>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(BrowserError::engine)?;
        Ok(Box::new(ChromiumPage::new(page)))
    }
}

/// A Chromium page driven through page scripts.
#[derive(Debug, Clone)]
pub struct ChromiumPage {
    page: Page,
    id: PageId,
}

impl ChromiumPage {
    /// Wraps an existing page.
    #[must_use]
    pub fn new(page: Page) -> Self {
        let id = page_id(&page);
        Self { page, id }
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> BrowserResult<T> {
        self.page
            .evaluate(script.as_str())
            .await
            .map_err(BrowserError::engine)?
            .into_value()
            .map_err(BrowserError::engine)
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        self.eval(query_script(selector, "found.length")?).await
    }
}

#[async_trait]
impl InboxPage for ChromiumPage {
    fn id(&self) -> &PageId {
        &self.id
    }

    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.page.goto(url).await.map_err(BrowserError::engine)?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.count(selector).await? > 0 {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::SelectorTimeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn texts(&self, selector: &str) -> BrowserResult<Vec<String>> {
        self.eval(query_script(
            selector,
            "found.map((el) => el.innerText ?? el.textContent ?? '')",
        )?)
        .await
    }

    async fn attributes(&self, selector: &str, name: &str) -> BrowserResult<Vec<Option<String>>> {
        let name = serde_json::to_string(name).map_err(BrowserError::engine)?;
        self.eval(query_script(
            selector,
            &format!("found.map((el) => el.getAttribute({name}))"),
        )?)
        .await
    }

    async fn click(&self, selector: &str, index: usize) -> BrowserResult<()> {
        let clicked: bool = self
            .eval(query_script(
                selector,
                &format!(
                    "(() => {{ const el = found[{index}]; if (!el) return false; el.click(); return true; }})()"
                ),
            )?)
            .await?;

        if clicked {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound {
                selector: format!("{selector} [{index}]"),
            })
        }
    }

    async fn close(&self) -> BrowserResult<()> {
        self.page.clone().close().await.map_err(BrowserError::engine)
    }
}

fn page_id(page: &Page) -> PageId {
    PageId::new(page.target_id().inner().clone())
}

/// Builds a script that collects every element matching `selector` in the
/// document and its same-origin frames into `found`, then evaluates `action`.
fn query_script(selector: &str, action: &str) -> BrowserResult<String> {
    let selector = serde_json::to_string(selector).map_err(BrowserError::engine)?;
    Ok(format!(
        r"(() => {{
    const selector = {selector};
    const found = [];
    const visit = (doc) => {{
        if (!doc) return;
        found.push(...doc.querySelectorAll(selector));
        for (const frame of doc.querySelectorAll('iframe, frame')) {{
            let inner = null;
            try {{ inner = frame.contentDocument; }} catch (e) {{ inner = null; }}
            visit(inner);
        }}
    }};
    visit(document);
    return {action};
}})()"
    ))
}
