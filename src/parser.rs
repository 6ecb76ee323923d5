//! Internal module for pulling the code out of a rendered message body.

use crate::matcher::Matcher;
use tracing::debug;

/// Longest body excerpt attached to parse errors, in characters.
pub(crate) const EXCERPT_CHARS: usize = 240;

/// Result of applying a matcher to a message body.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ExtractResult {
    /// A code was found (already trimmed).
    Match(String),
    /// The body held nothing the matcher recognises.
    NoMatch {
        /// Bounded excerpt of the body for diagnosis.
        excerpt: String,
    },
}

/// Applies `matcher` to the body text. The first match wins.
///
/// A match that is empty after trimming counts as no match, so a partial or
/// blank code is never handed back.
pub(crate) fn extract_code(body: &str, matcher: &dyn Matcher) -> ExtractResult {
    let found = matcher
        .find_match(body)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    if let Some(code) = found {
        debug!(
            matcher = %matcher.description(),
            code_len = code.len(),
            "Found code in message body"
        );
        ExtractResult::Match(code)
    } else {
        debug!(
            matcher = %matcher.description(),
            body_len = body.len(),
            "No code found in message body"
        );
        ExtractResult::NoMatch {
            excerpt: excerpt(body),
        }
    }
}

/// Collapses whitespace and cuts the body to [`EXCERPT_CHARS`] characters.
pub(crate) fn excerpt(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");

    match collapsed.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &collapsed[..cut]),
        None => collapsed,
    }
}
