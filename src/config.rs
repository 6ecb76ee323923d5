//! Configuration for the MFA code extractor.
//!
//! Use [`ExtractorConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use mfa_extractor::ExtractorConfig;
//! use std::time::Duration;
//!
//! let config = ExtractorConfig::builder()
//!     .domain("yopmail.com")
//!     .poll_interval(Duration::from_secs(2))
//!     .max_wait(Duration::from_secs(60))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.inbox_url_for("UserA123"), "https://yopmail.com/en/?login=UserA123");
//! ```
//!
//! The polling interval and deadline are empirical: they need to be long
//! enough for the provider to deliver mail in practice and carry no other
//! meaning.

use crate::address::InboxAddress;
use crate::error::{Error, Result};
use crate::matcher::{Matcher, MessageFilter, OtpMatcher};
use crate::providers::{render_template, InboxLayout, ProviderRegistry, DEFAULT_DOMAIN};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for [`MfaExtractor`](crate::MfaExtractor).
///
/// Create using [`ExtractorConfig::builder()`].
#[derive(Clone)]
pub struct ExtractorConfig {
    domain: String,
    inbox_url_template: String,
    layout: InboxLayout,
    /// Polling configuration for the inbox listing.
    pub polling: PollingConfig,
    /// Timeouts for individual browser operations.
    pub timeouts: TimeoutConfig,
    message_filter: MessageFilter,
    code_matcher: Arc<dyn Matcher>,
    /// Treat messages already in the inbox on the first poll as stale.
    pub ignore_existing: bool,
}

impl std::fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("domain", &self.domain)
            .field("inbox_url_template", &self.inbox_url_template)
            .field("layout", &self.layout)
            .field("polling", &self.polling)
            .field("timeouts", &self.timeouts)
            .field("message_filter", &self.message_filter.description())
            .field("code_matcher", &self.code_matcher.description())
            .field("ignore_existing", &self.ignore_existing)
            .finish()
    }
}

impl ExtractorConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder::default()
    }

    /// Returns the disposable-mail domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the inbox URL template.
    #[must_use]
    pub fn inbox_url_template(&self) -> &str {
        &self.inbox_url_template
    }

    /// Returns the inbox page layout.
    #[must_use]
    pub fn layout(&self) -> &InboxLayout {
        &self.layout
    }

    /// Returns the filter selecting the verification email.
    #[must_use]
    pub fn message_filter(&self) -> &MessageFilter {
        &self.message_filter
    }

    /// Returns the default code matcher.
    #[must_use]
    pub fn code_matcher(&self) -> &dyn Matcher {
        self.code_matcher.as_ref()
    }

    /// Binds a prefix to the configured domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrefix`] if the prefix is unusable.
    pub fn address(&self, prefix: &str) -> Result<InboxAddress> {
        InboxAddress::new(prefix, &self.domain)
    }

    /// Renders the inbox URL for an address.
    #[must_use]
    pub fn inbox_url(&self, address: &InboxAddress) -> String {
        render_template(&self.inbox_url_template, address.prefix(), address.domain())
    }

    /// Renders the inbox URL for a bare prefix on the configured domain.
    #[must_use]
    pub fn inbox_url_for(&self, prefix: &str) -> String {
        render_template(&self.inbox_url_template, prefix, &self.domain)
    }
}

/// Timeouts for individual browser operations.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Opening the secondary page.
    pub open_page: Duration,
    /// Navigating to the inbox.
    pub navigation: Duration,
    /// Listing queries, refresh and message clicks.
    pub selector: Duration,
    /// Waiting for the opened message body to render.
    pub body_render: Duration,
    /// Closing the secondary page.
    pub close: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            open_page: Duration::from_secs(10),
            navigation: Duration::from_secs(30),
            selector: Duration::from_secs(5),
            body_render: Duration::from_secs(15),
            close: Duration::from_secs(5),
        }
    }
}

/// Polling configuration for the inbox listing.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Interval between listing checks.
    pub interval: Duration,
    /// Maximum time to wait for the verification email.
    pub max_wait: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_wait: Duration::from_secs(90),
        }
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Default)]
pub struct ExtractorConfigBuilder {
    domain: Option<String>,
    provider_registry: Option<ProviderRegistry>,
    inbox_url_template: Option<String>,
    layout: Option<InboxLayout>,
    polling: Option<PollingConfig>,
    timeouts: Option<TimeoutConfig>,
    message_filter: Option<MessageFilter>,
    code_matcher: Option<Arc<dyn Matcher>>,
    ignore_existing: bool,
}

impl std::fmt::Debug for ExtractorConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorConfigBuilder")
            .field("domain", &self.domain)
            .field("inbox_url_template", &self.inbox_url_template)
            .field("polling", &self.polling)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl ExtractorConfigBuilder {
    /// Sets the disposable-mail domain (default: `yopmail.com`).
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets a custom provider registry used to resolve the domain.
    #[must_use]
    pub fn provider_registry(mut self, registry: ProviderRegistry) -> Self {
        self.provider_registry = Some(registry);
        self
    }

    /// Overrides the inbox URL template. Must contain `{prefix}` or `{address}`.
    #[must_use]
    pub fn inbox_url_template(mut self, template: impl Into<String>) -> Self {
        self.inbox_url_template = Some(template.into());
        self
    }

    /// Overrides the inbox page layout.
    #[must_use]
    pub fn layout(mut self, layout: InboxLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Sets polling configuration.
    #[must_use]
    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.polling = Some(polling);
        self
    }

    /// Sets the interval between listing checks.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.polling
            .get_or_insert_with(PollingConfig::default)
            .interval = interval;
        self
    }

    /// Sets the maximum wait for the verification email.
    #[must_use]
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.polling
            .get_or_insert_with(PollingConfig::default)
            .max_wait = max_wait;
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the navigation timeout.
    #[must_use]
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .navigation = timeout;
        self
    }

    /// Sets the body render timeout.
    #[must_use]
    pub fn body_render_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .body_render = timeout;
        self
    }

    /// Sets the filter selecting the verification email.
    #[must_use]
    pub fn message_filter(mut self, filter: MessageFilter) -> Self {
        self.message_filter = Some(filter);
        self
    }

    /// Sets the default code matcher (default: 6-digit OTP).
    #[must_use]
    pub fn code_matcher(mut self, matcher: impl Matcher + 'static) -> Self {
        self.code_matcher = Some(Arc::new(matcher));
        self
    }

    /// Ignores messages already present on the first poll.
    #[must_use]
    pub fn ignore_existing(mut self, ignore: bool) -> Self {
        self.ignore_existing = ignore;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the domain is empty, the URL
    /// template has no prefix placeholder, the polling interval is zero or
    /// longer than the deadline, or a timeout is zero.
    pub fn build(self) -> Result<ExtractorConfig> {
        let domain = self
            .domain
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string())
            .trim()
            .to_lowercase();
        if domain.is_empty() || domain.contains('@') {
            return Err(invalid(format!("invalid inbox domain '{domain}'")));
        }

        let registry = self.provider_registry.unwrap_or_default();
        let provider = registry.resolve(&domain);

        let inbox_url_template = self
            .inbox_url_template
            .unwrap_or_else(|| provider.url_template().to_string());
        if !inbox_url_template.contains("{prefix}") && !inbox_url_template.contains("{address}")
        {
            return Err(invalid(format!(
                "inbox URL template '{inbox_url_template}' has no {{prefix}} or {{address}} placeholder"
            )));
        }

        let layout = self.layout.unwrap_or_else(|| provider.layout().clone());
        if layout.message_item.is_empty()
            || layout.message_subject.is_empty()
            || layout.message_body.is_empty()
        {
            return Err(invalid("inbox layout selectors must not be empty".to_string()));
        }

        let polling = self.polling.unwrap_or_default();
        if polling.interval.is_zero() {
            return Err(invalid("poll interval must be non-zero".to_string()));
        }
        if polling.interval > polling.max_wait {
            return Err(invalid(format!(
                "poll interval {:?} exceeds max wait {:?}",
                polling.interval, polling.max_wait
            )));
        }

        let timeouts = self.timeouts.unwrap_or_default();
        if [
            timeouts.open_page,
            timeouts.navigation,
            timeouts.selector,
            timeouts.body_render,
            timeouts.close,
        ]
        .iter()
        .any(Duration::is_zero)
        {
            return Err(invalid("timeouts must be non-zero".to_string()));
        }

        Ok(ExtractorConfig {
            domain,
            inbox_url_template,
            layout,
            polling,
            timeouts,
            message_filter: self.message_filter.unwrap_or_default(),
            code_matcher: self
                .code_matcher
                .unwrap_or_else(|| Arc::new(OtpMatcher::six_digit())),
            ignore_existing: self.ignore_existing,
        })
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidConfig { message }
}
