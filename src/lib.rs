//! # mfa-extractor
//!
//! Out-of-band retrieval of e-mailed verification codes for browser-driven
//! end-to-end tests.
//!
//! While a test drives an onboarding form in one page, this crate opens a
//! second page in the same browsing context, reads a disposable inbox for the
//! address the form was given, waits for the verification email, and returns
//! the code in it. The second page is always closed again.
//!
//! ## Features
//!
//! - **`chromium`**: a [`BrowserContext`](browser::BrowserContext) backed by
//!   `chromiumoxide`. Without it, bring your own backend by implementing the
//!   traits in [`browser`].
//! - **`integration-tests`**: enables the live browser tests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mfa_extractor::{ExtractorConfig, MfaExtractor, OriginPage};
//! use mfa_extractor::browser::BrowserContext;
//! use std::time::Duration;
//!
//! # async fn example(context: &dyn BrowserContext, origin: &OriginPage) -> mfa_extractor::Result<()> {
//! let config = ExtractorConfig::builder()
//!     .domain("yopmail.com")
//!     .max_wait(Duration::from_secs(90))
//!     .build()?;
//! let extractor = MfaExtractor::new(config);
//!
//! // One unique inbox per run keeps parallel tests apart
//! let address = extractor.generate_address()?;
//! // ... type `address.as_email()` into the form and submit ...
//!
//! let code = extractor.extract_code(context, origin, address.prefix()).await?;
//! // ... type `code.as_str()` into the verification field ...
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Code Formats
//!
//! ```
//! use mfa_extractor::matcher::{Matcher, RegexMatcher};
//!
//! let matcher = RegexMatcher::with_description(r"\b([A-Z0-9]{8})\b", "8-char code").unwrap();
//! assert_eq!(matcher.find_match("Code: X7K2P9QA").as_deref(), Some("X7K2P9QA"));
//! ```
//!
//! Pass such a matcher to
//! [`ExtractorConfigBuilder::code_matcher`](config::ExtractorConfigBuilder::code_matcher)
//! or per call to [`MfaExtractor::extract_with`].
//!
//! ## Error Handling
//!
//! Extraction fails with one of three distinguishable kinds, each carrying
//! the address prefix for triage:
//!
//! ```
//! use mfa_extractor::{Error, ErrorKind};
//!
//! fn report(error: &Error) {
//!     match error.kind() {
//!         ErrorKind::NotFound => println!("no email yet, request a new code: {error}"),
//!         ErrorKind::Parse => println!("email template changed? {error}"),
//!         ErrorKind::TabLifecycle => println!("browser problem: {error}"),
//!         ErrorKind::Configuration => println!("caller bug: {error}"),
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation.
//!
//! ### Span Naming Convention
//!
//! - `MfaExtractor::extract_code` / `MfaExtractor::extract_with` - one extraction
//! - `MfaExtractor::poll_inbox` - the polling loop
//! - `SecondaryPage::open` / `SecondaryPage::close` - page lifecycle
//! - `chromium::open_page` - page creation (feature `chromium`)
//!
//! ### Standard Fields
//!
//! - `address_prefix` - inbox local part
//! - `inbox_domain` - disposable-mail domain
//! - `page_id` / `origin_page_id` - secondary and caller page
//! - `matcher` - matcher description
//! - `poll` - poll number

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod address;
pub mod browser;
pub mod config;
pub mod error;
pub mod matcher;
pub mod providers;

#[cfg(feature = "chromium")]
pub mod chromium;

// Internal modules
mod code;
mod extractor;
mod inbox;
mod page;
mod parser;

// Re-exports for ergonomic API
pub use address::InboxAddress;
pub use browser::{BrowserContext, BrowserError, InboxPage, OriginPage, PageId};
pub use code::VerificationCode;
pub use config::{ExtractorConfig, ExtractorConfigBuilder, PollingConfig, TimeoutConfig};
pub use error::{Error, ErrorKind, PageStage, Result};
pub use extractor::MfaExtractor;
pub use providers::{InboxLayout, InboxProvider, ProviderRegistry};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _ = ExtractorConfig::builder();
        let _ = ProviderRegistry::with_defaults();
        let _ = matcher::OtpMatcher::six_digit();
        let _ = OriginPage::new(PageId::new("origin"));
    }
}
