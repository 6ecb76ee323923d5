//! Internal module for reading the inbox listing.

use crate::browser::{BrowserResult, InboxPage};
use crate::matcher::MessageFilter;
use crate::providers::InboxLayout;
use std::collections::HashSet;
use tracing::{debug, trace};

/// One entry of the inbox listing as seen on a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MailMessage {
    /// Position in the listing, 0 = top (newest).
    pub position: usize,
    /// Stable identity across polls.
    pub key: String,
    pub subject: String,
    pub sender: Option<String>,
}

/// Reads the current listing. Every call re-queries the page.
pub(crate) async fn read_listing(
    page: &dyn InboxPage,
    layout: &InboxLayout,
) -> BrowserResult<Vec<MailMessage>> {
    let subjects = page.texts(&layout.message_subject).await?;

    let senders = match &layout.message_sender {
        Some(selector) => page.texts(selector).await?,
        None => Vec::new(),
    };

    let keys = match &layout.message_key_attribute {
        Some(attribute) => page.attributes(&layout.message_item, attribute).await?,
        None => Vec::new(),
    };

    Ok(assemble_listing(subjects, &senders, &keys))
}

/// Zips the per-field queries into listing entries.
///
/// Without an id attribute, the key counts from the bottom of the listing so
/// that it stays put when new mail is prepended.
fn assemble_listing(
    subjects: Vec<String>,
    senders: &[String],
    keys: &[Option<String>],
) -> Vec<MailMessage> {
    let total = subjects.len();

    subjects
        .into_iter()
        .enumerate()
        .map(|(position, subject)| {
            let subject = subject.trim().to_string();
            let sender = senders.get(position).map(|s| s.trim().to_string());
            let key = keys
                .get(position)
                .cloned()
                .flatten()
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| {
                    format!(
                        "{}|{}|{}",
                        total - position,
                        sender.as_deref().unwrap_or_default(),
                        subject
                    )
                });
            MailMessage {
                position,
                key,
                subject,
                sender,
            }
        })
        .collect()
}

/// Forward-only record of listing entries already inspected in this call.
#[derive(Debug, Default)]
pub(crate) struct SeenMessages {
    keys: HashSet<String>,
    baseline_taken: bool,
}

impl SeenMessages {
    /// Marks every entry of `listing` as stale without inspecting it.
    pub fn record_baseline(&mut self, listing: &[MailMessage]) {
        self.keys
            .extend(listing.iter().map(|message| message.key.clone()));
        self.baseline_taken = true;
        debug!(stale = listing.len(), "Recorded inbox baseline");
    }

    /// Returns `true` once a baseline has been recorded.
    pub fn has_baseline(&self) -> bool {
        self.baseline_taken
    }

    /// Returns the newest unseen entry accepted by `filter`.
    ///
    /// Entries rejected by the filter are remembered and never re-inspected.
    /// The accepted entry is remembered too.
    pub fn next_candidate(
        &mut self,
        listing: &[MailMessage],
        filter: &MessageFilter,
    ) -> Option<MailMessage> {
        for message in listing {
            if !self.keys.insert(message.key.clone()) {
                continue;
            }

            if filter.matches(&message.subject, message.sender.as_deref()) {
                return Some(message.clone());
            }

            trace!(
                key = %message.key,
                subject = %message.subject,
                "Skipping message rejected by filter"
            );
        }
        None
    }

    /// Number of entries seen so far.
    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(entries: &[(&str, &str)]) -> Vec<MailMessage> {
        let subjects = entries.iter().map(|(s, _)| (*s).to_string()).collect();
        let senders: Vec<String> = entries.iter().map(|(_, f)| (*f).to_string()).collect();
        assemble_listing(subjects, &senders, &[])
    }

    #[test]
    fn test_assemble_uses_id_attribute() {
        let messages = assemble_listing(
            vec!["Verify your email".into()],
            &["noreply@example.com".into()],
            &[Some("e_ZwZjAGN".into())],
        );
        assert_eq!(messages[0].key, "e_ZwZjAGN");
        assert_eq!(messages[0].sender.as_deref(), Some("noreply@example.com"));
    }

    #[test]
    fn test_positional_keys_survive_prepend() {
        let before = listing(&[("Welcome", "a@x")]);
        let after = listing(&[("Verify your email", "b@x"), ("Welcome", "a@x")]);
        assert_eq!(before[0].key, after[1].key);
        assert_ne!(after[0].key, after[1].key);
    }

    #[test]
    fn test_trims_listing_text() {
        let messages = assemble_listing(vec!["  Verify \n".into()], &[], &[]);
        assert_eq!(messages[0].subject, "Verify");
        assert_eq!(messages[0].sender, None);
    }

    #[test]
    fn test_next_candidate_newest_first() {
        let mut seen = SeenMessages::default();
        let messages = listing(&[("Your code", "b@x"), ("Verify your email", "a@x")]);
        let found = seen
            .next_candidate(&messages, &MessageFilter::verification())
            .unwrap();
        assert_eq!(found.position, 0);
    }

    #[test]
    fn test_rejected_messages_not_reinspected() {
        let mut seen = SeenMessages::default();
        let filter = MessageFilter::verification();

        let first = listing(&[("Newsletter", "news@x")]);
        assert!(seen.next_candidate(&first, &filter).is_none());
        assert_eq!(seen.len(), 1);

        let second = listing(&[("Verify your email", "noreply@x"), ("Newsletter", "news@x")]);
        let found = seen.next_candidate(&second, &filter).unwrap();
        assert_eq!(found.subject, "Verify your email");
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_baseline_marks_existing_as_stale() {
        let mut seen = SeenMessages::default();
        let filter = MessageFilter::verification();

        let stale = listing(&[("Verify your email", "noreply@x")]);
        seen.record_baseline(&stale);
        assert!(seen.has_baseline());
        assert!(seen.next_candidate(&stale, &filter).is_none());

        let fresh = listing(&[
            ("Verify your email", "noreply@x"),
            ("Verify your email", "noreply@x"),
        ]);
        let found = seen.next_candidate(&fresh, &filter).unwrap();
        assert_eq!(found.position, 0);
    }
}
