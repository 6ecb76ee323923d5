//! The MFA code extractor.
//!
//! [`MfaExtractor`] opens a secondary page in the caller's browsing context,
//! reads the disposable inbox for the given prefix, waits for the
//! verification email, extracts the code, and closes the page again.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> TabOpened -> Polling -> MessageFound -> BodyExtracted -> Parsed
//!   \________\____________\___________\_______________\-> Failed
//! Parsed | Failed -> Cleanup (page closed) -> return
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mfa_extractor::{ExtractorConfig, MfaExtractor, OriginPage};
//! use mfa_extractor::browser::BrowserContext;
//!
//! # async fn example(context: &dyn BrowserContext, origin: &OriginPage) -> mfa_extractor::Result<()> {
//! let extractor = MfaExtractor::new(ExtractorConfig::builder().build()?);
//!
//! let address = extractor.generate_address()?;
//! // ... register `address.as_email()` on the onboarding form ...
//!
//! let code = extractor.extract_code(context, origin, address.prefix()).await?;
//! println!("Got code: {code}");
//! # Ok(())
//! # }
//! ```

use crate::address::InboxAddress;
use crate::browser::{bounded, BrowserContext, InboxPage, OriginPage};
use crate::code::VerificationCode;
use crate::config::ExtractorConfig;
use crate::error::{Error, ErrorKind, PageStage, Result};
use crate::inbox::{self, MailMessage, SeenMessages};
use crate::matcher::Matcher;
use crate::page::SecondaryPage;
use crate::parser::{self, ExtractResult};
use std::fmt;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Length of prefixes produced by [`MfaExtractor::generate_address`].
const GENERATED_PREFIX_LEN: usize = 12;

/// Retrieves verification codes from a disposable inbox.
///
/// The extractor holds only configuration and can serve any number of
/// sequential or concurrent extractions; each call owns its own page.
#[derive(Debug, Clone)]
pub struct MfaExtractor {
    config: ExtractorConfig,
}

impl MfaExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Generates a fresh random inbox address on the configured domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrefix`] if the configured domain cannot form
    /// a valid address.
    pub fn generate_address(&self) -> Result<InboxAddress> {
        InboxAddress::generate(self.config.domain(), GENERATED_PREFIX_LEN)
    }

    /// Returns the code e-mailed to `address_prefix` on the configured domain,
    /// using the configured code matcher.
    ///
    /// Exactly one secondary page is opened in `context` and it is closed
    /// before this returns, whatever the outcome. `origin` is never touched.
    /// Dropping the returned future cancels the extraction; the page is then
    /// closed in the background.
    ///
    /// The `max_wait` deadline starts with the call. Opening the page and
    /// loading the inbox count against it as well as polling.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPrefix`] if the prefix is unusable (no page is opened)
    /// - [`Error::NotFound`] if no verification email arrives before the deadline
    /// - [`Error::Parse`] if it arrives without a recognisable code
    /// - [`Error::TabLifecycle`] if the page cannot be opened, driven, or closed
    #[instrument(
        name = "MfaExtractor::extract_code",
        skip(self, context, origin),
        fields(
            inbox_domain = %self.config.domain(),
            origin_page_id = %origin.id(),
            matcher = %self.config.code_matcher().description()
        )
    )]
    pub async fn extract_code(
        &self,
        context: &dyn BrowserContext,
        origin: &OriginPage,
        address_prefix: &str,
    ) -> Result<VerificationCode> {
        self.run(context, origin, address_prefix, self.config.code_matcher())
            .await
    }

    /// Like [`extract_code`](Self::extract_code), with a caller-supplied matcher.
    ///
    /// # Errors
    ///
    /// Same as [`extract_code`](Self::extract_code).
    #[instrument(
        name = "MfaExtractor::extract_with",
        skip(self, context, origin, matcher),
        fields(
            inbox_domain = %self.config.domain(),
            origin_page_id = %origin.id(),
            matcher = %matcher.description()
        )
    )]
    pub async fn extract_with(
        &self,
        context: &dyn BrowserContext,
        origin: &OriginPage,
        address_prefix: &str,
        matcher: &dyn Matcher,
    ) -> Result<VerificationCode> {
        self.run(context, origin, address_prefix, matcher).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private methods
    // ─────────────────────────────────────────────────────────────────────────

    async fn run(
        &self,
        context: &dyn BrowserContext,
        origin: &OriginPage,
        address_prefix: &str,
        matcher: &dyn Matcher,
    ) -> Result<VerificationCode> {
        let address = self.config.address(address_prefix)?;
        let mut progress = Progress::default();
        let deadline = Instant::now() + self.config.polling.max_wait;

        let opened = tokio::time::timeout_at(
            deadline,
            SecondaryPage::open(context, origin, &address, &self.config.timeouts),
        )
        .await
        .map_err(|_| self.not_found(&address))
        .and_then(|opened| opened);
        let page = match opened {
            Ok(page) => page,
            Err(e) => {
                progress.fail(&e);
                return Err(e);
            }
        };
        progress.advance(ExtractionState::TabOpened);

        let outcome = self
            .read_code(&page, &address, matcher, deadline, &mut progress)
            .await;
        match &outcome {
            Ok(_) => progress.advance(ExtractionState::Parsed),
            Err(e) => progress.fail(e),
        }

        progress.advance(ExtractionState::Cleanup);
        let page_id = page.id().clone();
        let closed = page.close().await;

        match (outcome, closed) {
            (Ok(code), Ok(())) => {
                info!(%page_id, code_len = code.as_str().len(), "Extracted verification code");
                Ok(code)
            }
            (Ok(_), Err(close_error)) => Err(close_error),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_error)) => {
                warn!(
                    %page_id,
                    error = %close_error,
                    "Secondary page close failed after extraction error"
                );
                Err(e)
            }
        }
    }

    /// Navigates, polls, opens the message and parses its body.
    ///
    /// Everything up to finding the message is cut off at `deadline`.
    async fn read_code(
        &self,
        page: &SecondaryPage,
        address: &InboxAddress,
        matcher: &dyn Matcher,
        deadline: Instant,
        progress: &mut Progress,
    ) -> Result<VerificationCode> {
        let timeouts = &self.config.timeouts;
        let layout = self.config.layout();
        let tab = page
            .page()
            .map_err(|e| page.lifecycle_error(PageStage::Navigate, e))?;

        let url = self.config.inbox_url(address);
        let locate = async {
            debug!(url = %url, "Navigating to inbox");
            bounded("navigate", timeouts.navigation, tab.navigate(&url))
                .await
                .map_err(|e| page.lifecycle_error(PageStage::Navigate, e))?;

            progress.advance(ExtractionState::Polling);
            self.poll_inbox(page, tab, address, &url, deadline).await
        };
        let message = tokio::time::timeout_at(deadline, locate)
            .await
            .map_err(|_| self.not_found(address))??;
        progress.advance(ExtractionState::MessageFound);

        bounded(
            "click",
            timeouts.selector,
            tab.click(&layout.message_item, message.position),
        )
        .await
        .map_err(|e| page.lifecycle_error(PageStage::OpenMessage, e))?;

        bounded(
            "wait_for_selector",
            timeouts.body_render,
            tab.wait_for_selector(&layout.message_body, timeouts.body_render),
        )
        .await
        .map_err(|e| page.lifecycle_error(PageStage::RenderBody, e))?;

        let body = bounded("get_text", timeouts.selector, tab.text(&layout.message_body))
            .await
            .map_err(|e| page.lifecycle_error(PageStage::RenderBody, e))?;
        progress.advance(ExtractionState::BodyExtracted);

        match parser::extract_code(&body, matcher) {
            ExtractResult::Match(code) => Ok(VerificationCode::new(code)),
            ExtractResult::NoMatch { excerpt } => Err(Error::Parse {
                address_prefix: address.prefix().to_string(),
                matcher: matcher.description().to_string(),
                excerpt,
            }),
        }
    }

    /// Re-reads the listing every interval until the verification email shows up.
    #[instrument(
        name = "MfaExtractor::poll_inbox",
        skip_all,
        fields(
            address_prefix = %address.prefix(),
            page_id = %page.id(),
            filter = %self.config.message_filter().description()
        )
    )]
    async fn poll_inbox(
        &self,
        page: &SecondaryPage,
        tab: &dyn InboxPage,
        address: &InboxAddress,
        url: &str,
        deadline: Instant,
    ) -> Result<MailMessage> {
        let polling = &self.config.polling;
        let timeouts = &self.config.timeouts;
        let layout = self.config.layout();
        let filter = self.config.message_filter();
        let mut seen = SeenMessages::default();
        let mut poll: u32 = 0;

        loop {
            poll += 1;

            if poll > 1 {
                match &layout.refresh {
                    Some(selector) => bounded("refresh", timeouts.selector, tab.click(selector, 0))
                        .await
                        .map_err(|e| page.lifecycle_error(PageStage::RenderListing, e))?,
                    None => bounded("navigate", timeouts.navigation, tab.navigate(url))
                        .await
                        .map_err(|e| page.lifecycle_error(PageStage::Navigate, e))?,
                }
            }

            let listing = bounded(
                "read_listing",
                timeouts.selector,
                inbox::read_listing(tab, layout),
            )
            .await
            .map_err(|e| page.lifecycle_error(PageStage::RenderListing, e))?;

            debug!(
                poll,
                listed = listing.len(),
                seen = seen.len(),
                "Polled inbox"
            );

            if self.config.ignore_existing && !seen.has_baseline() {
                seen.record_baseline(&listing);
            } else if let Some(message) = seen.next_candidate(&listing, filter) {
                debug!(
                    poll,
                    key = %message.key,
                    subject = %message.subject,
                    "Verification email found"
                );
                return Ok(message);
            }

            if Instant::now() >= deadline {
                return Err(self.not_found(address));
            }

            tokio::time::sleep(polling.interval).await;
        }
    }

    fn not_found(&self, address: &InboxAddress) -> Error {
        Error::NotFound {
            address_prefix: address.prefix().to_string(),
            timeout: self.config.polling.max_wait,
        }
    }
}

/// States of one extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExtractionState {
    Idle,
    TabOpened,
    Polling,
    MessageFound,
    BodyExtracted,
    Parsed,
    Failed(ErrorKind),
    Cleanup,
}

impl fmt::Display for ExtractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionState::Idle => write!(f, "idle"),
            ExtractionState::TabOpened => write!(f, "tab_opened"),
            ExtractionState::Polling => write!(f, "polling"),
            ExtractionState::MessageFound => write!(f, "message_found"),
            ExtractionState::BodyExtracted => write!(f, "body_extracted"),
            ExtractionState::Parsed => write!(f, "parsed"),
            ExtractionState::Failed(kind) => write!(f, "failed({kind})"),
            ExtractionState::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Tracks and logs state transitions.
#[derive(Debug)]
struct Progress {
    state: ExtractionState,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            state: ExtractionState::Idle,
        }
    }
}

impl Progress {
    fn advance(&mut self, next: ExtractionState) {
        debug!(from = %self.state, to = %next, "Extraction state");
        self.state = next;
    }

    fn fail(&mut self, error: &Error) {
        debug!(from = %self.state, error = %error, "Extraction failed");
        self.state = ExtractionState::Failed(error.kind());
    }
}
