//! Disposable inbox addresses.
//!
//! An [`InboxAddress`] pairs a per-run local part (the *prefix*) with the
//! fixed disposable-mail domain. The same prefix must be typed into the
//! onboarding form and handed to the extractor.
//!
//! ```
//! use mfa_extractor::InboxAddress;
//!
//! let address = InboxAddress::new("UserA123", "yopmail.com").unwrap();
//! assert_eq!(address.as_email(), "UserA123@yopmail.com");
//!
//! let generated = InboxAddress::generate("yopmail.com", 12).unwrap();
//! assert_eq!(generated.prefix().len(), 12);
//! ```

use crate::error::{Error, Result};
use email_address::EmailAddress;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;

/// Shortest generated prefix.
pub const MIN_GENERATED_LEN: usize = 6;
/// Longest generated prefix.
pub const MAX_GENERATED_LEN: usize = 32;

/// A full disposable inbox address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxAddress {
    prefix: String,
    domain: String,
    email: EmailAddress,
}

impl InboxAddress {
    /// Combines `prefix` and `domain` into a validated address.
    ///
    /// The prefix is used verbatim. Whitespace or an `@` anywhere in it is
    /// rejected rather than silently cleaned up, because a prefix that differs
    /// from the one registered on the form would read the wrong inbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrefix`] if the prefix is empty, contains
    /// whitespace or `@`, or does not form a valid e-mail address.
    pub fn new(prefix: &str, domain: &str) -> Result<Self> {
        let reject = |reason: &str| Error::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: reason.to_string(),
        };

        if prefix.is_empty() {
            return Err(reject("prefix is empty"));
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(reject("prefix contains whitespace"));
        }
        if prefix.contains('@') {
            return Err(reject("prefix must not contain '@'"));
        }

        let raw = format!("{prefix}@{domain}");
        let email = EmailAddress::parse_with_options(&raw, email_address::Options::default())
            .map_err(|e| Error::InvalidPrefix {
                prefix: prefix.to_string(),
                reason: format!("'{raw}' is not a valid address: {e}"),
            })?;

        Ok(Self {
            prefix: prefix.to_string(),
            domain: domain.to_string(),
            email,
        })
    }

    /// Generates a random lowercase alphanumeric prefix on `domain`.
    ///
    /// `len` is clamped to `6..=32`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrefix`] if `domain` cannot form a valid address.
    pub fn generate(domain: &str, len: usize) -> Result<Self> {
        Self::new(&generate_prefix(len), domain)
    }

    /// Returns the local part.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the disposable-mail domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the full address.
    #[must_use]
    pub fn as_email(&self) -> &str {
        self.email.as_str()
    }
}

impl fmt::Display for InboxAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_email())
    }
}

/// Generates a random lowercase alphanumeric local part.
#[must_use]
pub fn generate_prefix(len: usize) -> String {
    let length = len.clamp(MIN_GENERATED_LEN, MAX_GENERATED_LEN);
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_prefix_verbatim() {
        let address = InboxAddress::new("UserB456", "yopmail.com").unwrap();
        assert_eq!(address.prefix(), "UserB456");
        assert_eq!(address.domain(), "yopmail.com");
        assert_eq!(address.to_string(), "UserB456@yopmail.com");
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let err = InboxAddress::new("", "yopmail.com").unwrap_err();
        assert!(matches!(err, Error::InvalidPrefix { .. }));
    }

    #[test]
    fn test_whitespace_prefix_rejected() {
        assert!(InboxAddress::new(" user1", "yopmail.com").is_err());
        assert!(InboxAddress::new("us er", "yopmail.com").is_err());
    }

    #[test]
    fn test_at_sign_rejected() {
        let err = InboxAddress::new("user@yopmail.com", "yopmail.com").unwrap_err();
        assert_eq!(err.address_prefix(), Some("user@yopmail.com"));
    }

    #[test]
    fn test_invalid_domain_rejected() {
        assert!(InboxAddress::new("user1", "").is_err());
    }

    #[test]
    fn test_generate_clamps_length() {
        assert_eq!(generate_prefix(1).len(), MIN_GENERATED_LEN);
        assert_eq!(generate_prefix(100).len(), MAX_GENERATED_LEN);
        assert_eq!(generate_prefix(10).len(), 10);
    }

    #[test]
    fn test_generated_prefix_is_lowercase_alphanumeric() {
        let prefix = generate_prefix(32);
        assert!(prefix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generated_addresses_differ() {
        let a = InboxAddress::generate("yopmail.com", 16).unwrap();
        let b = InboxAddress::generate("yopmail.com", 16).unwrap();
        assert_ne!(a, b);
    }
}
