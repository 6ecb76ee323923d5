//! Content matching for locating verification emails and extracting codes.
//!
//! Two concerns live here:
//!
//! - [`Matcher`] extracts a value (usually the code) from rendered message text.
//! - [`MessageFilter`] decides from the inbox listing which message is the
//!   verification email, based on its subject or sender.
//!
//! # Example
//!
//! ```
//! use mfa_extractor::matcher::{Matcher, MessageFilter, OtpMatcher, RegexMatcher};
//!
//! let otp = OtpMatcher::six_digit();
//! assert_eq!(
//!     otp.find_match("Your code is 483920. It expires in 10 minutes.").as_deref(),
//!     Some("483920")
//! );
//!
//! let custom = RegexMatcher::new(r"code:\s*([A-Z0-9]{8})").unwrap();
//! assert_eq!(custom.find_match("code: AB12CD34").as_deref(), Some("AB12CD34"));
//!
//! let filter = MessageFilter::verification();
//! assert!(filter.matches("Verify your email", None));
//! ```

use regex::Regex;
use std::borrow::Cow;

/// Trait for extracting content from a message body.
///
/// Implement this trait to define custom extraction logic.
///
/// # Example
///
/// ```
/// use mfa_extractor::matcher::Matcher;
/// use std::borrow::Cow;
///
/// struct LastWordMatcher;
///
/// impl Matcher for LastWordMatcher {
///     fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
///         text.split_whitespace().last().map(Cow::Borrowed)
///     }
///
///     fn description(&self) -> &str {
///         "last word"
///     }
/// }
/// ```
pub trait Matcher: Send + Sync {
    /// Attempts to find and extract matching content from the text.
    ///
    /// Returns `Some(matched_value)` if found, `None` otherwise. The first
    /// match in document order wins.
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>>;

    /// Returns a human-readable description of what this matcher looks for.
    ///
    /// Used in logging and error messages.
    fn description(&self) -> &str;
}

/// Regex-based matcher that extracts the first capture group.
///
/// # Example
///
/// ```
/// use mfa_extractor::matcher::{Matcher, RegexMatcher};
///
/// let matcher = RegexMatcher::new(r"code:\s*(\d+)").unwrap();
/// assert_eq!(matcher.find_match("Your code: 42"), Some("42".into()));
/// ```
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    description: String,
}

impl RegexMatcher {
    /// Creates a new regex matcher.
    ///
    /// The first capture group is extracted; a pattern without groups yields
    /// the whole match.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            description: format!("regex pattern: {pattern}"),
            regex,
        })
    }

    /// Creates a new regex matcher with a custom description.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    ///
    /// # Example
    ///
    /// ```
    /// use mfa_extractor::matcher::RegexMatcher;
    ///
    /// let matcher = RegexMatcher::with_description(
    ///     r"\b(\d{6})\b",
    ///     "6-digit verification code"
    /// ).unwrap();
    /// ```
    pub fn with_description(
        pattern: &str,
        description: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            description: description.into(),
            regex,
        })
    }
}

impl Matcher for RegexMatcher {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| Cow::Borrowed(m.as_str()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Matcher for numeric one-time codes of a fixed length.
///
/// # Example
///
/// ```
/// use mfa_extractor::matcher::{Matcher, OtpMatcher};
///
/// let otp = OtpMatcher::six_digit();
/// assert_eq!(otp.find_match("Your code is 123456."), Some("123456".into()));
/// assert_eq!(otp.find_match("Code: 12345"), None);
/// ```
#[derive(Debug, Clone)]
pub struct OtpMatcher {
    inner: RegexMatcher,
}

impl OtpMatcher {
    /// Creates a matcher for 6-digit codes.
    #[must_use]
    pub fn six_digit() -> Self {
        Self::n_digit(6)
    }

    /// Creates a matcher for codes of exactly `digits` digits.
    ///
    /// Word boundaries keep longer digit runs (phone numbers, dates) from
    /// matching partially.
    ///
    /// # Panics
    ///
    /// Panics if `digits` is 0.
    #[must_use]
    pub fn n_digit(digits: usize) -> Self {
        assert!(digits > 0, "digits must be > 0");
        let pattern = format!(r"\b(\d{{{digits}}})\b");
        Self {
            inner: RegexMatcher::with_description(&pattern, format!("{digits}-digit OTP code"))
                .expect("valid regex"),
        }
    }

    /// Creates a matcher for codes with a custom regex.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn custom(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            inner: RegexMatcher::with_description(pattern, "custom OTP pattern")?,
        })
    }
}

impl Default for OtpMatcher {
    fn default() -> Self {
        Self::six_digit()
    }
}

impl Matcher for OtpMatcher {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        self.inner.find_match(text)
    }

    fn description(&self) -> &str {
        self.inner.description()
    }
}

/// Matcher using a closure for custom extraction logic.
///
/// # Example
///
/// ```
/// use mfa_extractor::matcher::{ClosureMatcher, Matcher};
/// use std::borrow::Cow;
///
/// let matcher = ClosureMatcher::new(
///     |text| {
///         text.lines()
///             .find(|line| line.starts_with("Code:"))
///             .map(|line| Cow::Owned(line.trim_start_matches("Code:").trim().to_string()))
///     },
///     "code line extractor"
/// );
///
/// let text = "Hello\nCode: ABC123\nThanks";
/// assert_eq!(matcher.find_match(text).as_deref(), Some("ABC123"));
/// ```
pub struct ClosureMatcher<F>
where
    F: for<'a> Fn(&'a str) -> Option<Cow<'a, str>> + Send + Sync,
{
    matcher_fn: F,
    description: String,
}

impl<F> ClosureMatcher<F>
where
    F: for<'a> Fn(&'a str) -> Option<Cow<'a, str>> + Send + Sync,
{
    /// Creates a new closure-based matcher.
    #[must_use]
    pub fn new(matcher_fn: F, description: impl Into<String>) -> Self {
        Self {
            matcher_fn,
            description: description.into(),
        }
    }
}

impl<F> Matcher for ClosureMatcher<F>
where
    F: for<'a> Fn(&'a str) -> Option<Cow<'a, str>> + Send + Sync,
{
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        (self.matcher_fn)(text)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl<F> std::fmt::Debug for ClosureMatcher<F>
where
    F: for<'a> Fn(&'a str) -> Option<Cow<'a, str>> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureMatcher")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Selects the verification email from an inbox listing.
///
/// A message is accepted when its subject or its sender matches. A filter
/// without any pattern accepts every message.
///
/// # Example
///
/// ```
/// use mfa_extractor::matcher::MessageFilter;
///
/// let filter = MessageFilter::subject(r"(?i)verify your email").unwrap();
/// assert!(filter.matches("Verify your email", Some("noreply@example.com")));
/// assert!(!filter.matches("Weekly newsletter", Some("news@example.com")));
/// ```
#[derive(Debug, Clone)]
pub struct MessageFilter {
    subject: Option<Regex>,
    sender: Option<Regex>,
    description: String,
}

impl MessageFilter {
    /// Accepts any message.
    #[must_use]
    pub fn any() -> Self {
        Self {
            subject: None,
            sender: None,
            description: "any message".to_string(),
        }
    }

    /// Accepts messages whose subject or sender mentions verification.
    #[must_use]
    pub fn verification() -> Self {
        let pattern = r"(?i)verif|code|confirm";
        let regex = Regex::new(pattern).expect("valid regex");
        Self {
            subject: Some(regex.clone()),
            sender: Some(regex),
            description: "verification email".to_string(),
        }
    }

    /// Accepts messages whose subject matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn subject(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            subject: Some(Regex::new(pattern)?),
            sender: None,
            description: format!("subject ~ {pattern}"),
        })
    }

    /// Accepts messages whose sender matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn sender(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            subject: None,
            sender: Some(Regex::new(pattern)?),
            description: format!("sender ~ {pattern}"),
        })
    }

    /// Also accepts messages whose sender matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn or_sender(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.sender = Some(Regex::new(pattern)?);
        self.description = format!("{} or sender ~ {pattern}", self.description);
        Ok(self)
    }

    /// Returns `true` if a listing entry with this subject and sender is the
    /// message being waited for.
    #[must_use]
    pub fn matches(&self, subject: &str, sender: Option<&str>) -> bool {
        if self.subject.is_none() && self.sender.is_none() {
            return true;
        }

        let subject_hit = self
            .subject
            .as_ref()
            .is_some_and(|regex| regex.is_match(subject));
        let sender_hit = match (&self.sender, sender) {
            (Some(regex), Some(sender)) => regex.is_match(sender),
            _ => false,
        };

        subject_hit || sender_hit
    }

    /// Returns a human-readable description of the filter.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self::verification()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_matcher() {
        let matcher = RegexMatcher::new(r"code:\s*(\d+)").unwrap();
        assert_eq!(
            matcher.find_match("Your code: 12345").as_deref(),
            Some("12345")
        );
        assert_eq!(matcher.find_match("No code here"), None);
    }

    #[test]
    fn test_regex_matcher_without_group() {
        let matcher = RegexMatcher::new(r"[A-Z]{3}-\d{3}").unwrap();
        assert_eq!(
            matcher.find_match("ticket ABC-123 opened").as_deref(),
            Some("ABC-123")
        );
    }

    #[test]
    fn test_otp_six_digit() {
        let otp = OtpMatcher::six_digit();
        assert_eq!(
            otp.find_match("Your code is 483920. It expires in 10 minutes.")
                .as_deref(),
            Some("483920")
        );
        assert_eq!(otp.find_match("Code: 12345"), None);
        assert_eq!(otp.find_match("Code: 1234567"), None);
        assert_eq!(otp.find_match("order code483920"), None);
    }

    #[test]
    fn test_otp_first_match_wins() {
        let otp = OtpMatcher::six_digit();
        assert_eq!(
            otp.find_match("Use 111111 now, not 222222").as_deref(),
            Some("111111")
        );
    }

    #[test]
    fn test_otp_n_digit() {
        let otp = OtpMatcher::n_digit(4);
        assert_eq!(otp.find_match("PIN: 1234").as_deref(), Some("1234"));
        assert_eq!(otp.find_match("PIN: 12345"), None);
        assert_eq!(otp.description(), "4-digit OTP code");
    }

    #[test]
    fn test_closure_matcher() {
        let matcher = ClosureMatcher::new(
            |text| {
                text.lines()
                    .find(|line| line.contains("SECRET"))
                    .map(|line| Cow::Owned(line.replace("SECRET:", "").trim().to_string()))
            },
            "secret extractor",
        );

        let text = "Header\nSECRET: my-value\nFooter";
        assert_eq!(matcher.find_match(text).as_deref(), Some("my-value"));
    }

    #[test]
    fn test_regex_matcher_returns_borrowed() {
        let matcher = RegexMatcher::new(r"code:\s*(\d+)").unwrap();
        let result = matcher.find_match("Your code: 12345");
        assert!(matches!(result, Some(Cow::Borrowed(_))));
    }

    #[test]
    fn test_verification_filter() {
        let filter = MessageFilter::verification();
        assert!(filter.matches("Verify your email", None));
        assert!(filter.matches("Your sign-up CODE", None));
        assert!(filter.matches("Welcome", Some("confirmations@example.com")));
        assert!(!filter.matches("Weekly newsletter", Some("news@example.com")));
    }

    #[test]
    fn test_any_filter() {
        let filter = MessageFilter::any();
        assert!(filter.matches("", None));
        assert!(filter.matches("Whatever", Some("x@y.z")));
    }

    #[test]
    fn test_subject_or_sender() {
        let filter = MessageFilter::subject("^Verify")
            .unwrap()
            .or_sender("@onboarding\\.example$")
            .unwrap();
        assert!(filter.matches("Verify your email", None));
        assert!(filter.matches("Hello", Some("no-reply@onboarding.example")));
        assert!(!filter.matches("Hello", Some("no-reply@other.example")));
        assert!(filter.description().contains("or sender"));
    }
}
