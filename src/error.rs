//! Error types for the mfa-extractor crate.
//!
//! Every failure of an extraction surfaces as one of three distinguishable
//! kinds (see [`ErrorKind`]): the code never arrived, it arrived but could not
//! be parsed, or the secondary page could not be driven. Caller bugs such as
//! an empty address prefix are reported as configuration errors before any
//! page is opened.

use crate::browser::BrowserError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting a verification code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Caller / configuration errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// The address prefix cannot form a valid inbox address.
    #[error("invalid address prefix '{prefix}': {reason}")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Extraction outcomes
    // ─────────────────────────────────────────────────────────────────────────
    /// No matching message arrived before the deadline.
    #[error("not_found: no verification email for prefix '{address_prefix}' within {timeout:?}")]
    NotFound {
        /// Prefix of the polled inbox.
        address_prefix: String,
        /// The polling deadline that was exceeded.
        timeout: Duration,
    },

    /// A matching message arrived but no code could be located in its body.
    #[error(
        "parse: no {matcher} in verification email for prefix '{address_prefix}' (body: {excerpt:?})"
    )]
    Parse {
        /// Prefix of the polled inbox.
        address_prefix: String,
        /// Description of the matcher that was applied.
        matcher: String,
        /// Bounded excerpt of the message body.
        excerpt: String,
    },

    /// The secondary page could not be opened, driven, or closed.
    #[error("tab_lifecycle: {stage} failed for prefix '{address_prefix}'")]
    TabLifecycle {
        /// Prefix of the inbox being read.
        address_prefix: String,
        /// The lifecycle step that failed.
        stage: PageStage,
        /// The underlying browser error.
        #[source]
        source: BrowserError,
    },
}

impl Error {
    /// Returns `true` if calling the extractor again could succeed.
    ///
    /// Only [`Error::NotFound`] qualifies: the caller may request a fresh code
    /// and try again. Parse failures point at a changed e-mail template and
    /// lifecycle failures at a broken automation session.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,

            Error::InvalidPrefix { .. }
            | Error::InvalidConfig { .. }
            | Error::Parse { .. }
            | Error::TabLifecycle { .. } => false,
        }
    }

    /// Returns the error kind for triage and logging.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidPrefix { .. } | Error::InvalidConfig { .. } => {
                ErrorKind::Configuration
            }
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::TabLifecycle { .. } => ErrorKind::TabLifecycle,
        }
    }

    /// Returns the address prefix involved, if the error concerns one.
    #[must_use]
    pub fn address_prefix(&self) -> Option<&str> {
        match self {
            Error::InvalidPrefix { prefix, .. } => Some(prefix),
            Error::NotFound { address_prefix, .. }
            | Error::Parse { address_prefix, .. }
            | Error::TabLifecycle { address_prefix, .. } => Some(address_prefix),
            Error::InvalidConfig { .. } => None,
        }
    }
}

/// Error kinds, one per distinguishable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid configuration or caller input.
    Configuration,
    /// No matching message arrived in time.
    NotFound,
    /// A matching message had no recognisable code.
    Parse,
    /// The secondary page failed to open, navigate, render, or close.
    TabLifecycle,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::TabLifecycle => write!(f, "tab_lifecycle"),
        }
    }
}

/// Steps of the secondary page lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStage {
    /// Opening the page in the shared context.
    Open,
    /// The context handed back the caller's own page.
    OriginReuse,
    /// Navigating to the inbox.
    Navigate,
    /// Reading or refreshing the message listing.
    RenderListing,
    /// Opening the matched message.
    OpenMessage,
    /// Waiting for and reading the message body.
    RenderBody,
    /// Closing the page.
    Close,
}

impl fmt::Display for PageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageStage::Open => "open page",
            PageStage::OriginReuse => "origin page isolation",
            PageStage::Navigate => "navigate to inbox",
            PageStage::RenderListing => "read inbox listing",
            PageStage::OpenMessage => "open message",
            PageStage::RenderBody => "render message body",
            PageStage::Close => "close page",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let err = Error::NotFound {
            address_prefix: "user1".into(),
            timeout: Duration::from_secs(90),
        };
        assert!(err.is_retryable());

        let err = Error::Parse {
            address_prefix: "user1".into(),
            matcher: "6-digit OTP code".into(),
            excerpt: "Thanks!".into(),
        };
        assert!(!err.is_retryable());

        let err = Error::TabLifecycle {
            address_prefix: "user1".into(),
            stage: PageStage::Open,
            source: BrowserError::engine("target crashed"),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_kinds() {
        let err = Error::InvalidPrefix {
            prefix: String::new(),
            reason: "empty".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = Error::NotFound {
            address_prefix: "user1".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.kind().to_string(), "not_found");
    }

    #[test]
    fn test_message_names_kind_and_prefix() {
        let err = Error::TabLifecycle {
            address_prefix: "NoSuchUser9999".into(),
            stage: PageStage::Navigate,
            source: BrowserError::engine("net::ERR_NAME_NOT_RESOLVED"),
        };
        let message = err.to_string();
        assert!(message.starts_with("tab_lifecycle"));
        assert!(message.contains("NoSuchUser9999"));
        assert_eq!(err.address_prefix(), Some("NoSuchUser9999"));
    }

    #[test]
    fn test_config_error_has_no_prefix() {
        let err = Error::InvalidConfig {
            message: "bad".into(),
        };
        assert_eq!(err.address_prefix(), None);
    }
}
