//! Disposable-mail providers: where the inbox lives and how its page is laid out.
//!
//! A provider maps a mail domain to an inbox URL template and an
//! [`InboxLayout`] (the selectors used to read the listing and the message
//! body). Yopmail and its alternate domains are built in.
//!
//! # Example
//!
//! ```
//! use mfa_extractor::providers::{InboxLayout, InboxProvider, ProviderRegistry};
//!
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.resolve("yopmail.fr");
//! assert_eq!(
//!     provider.inbox_url("UserA123", "yopmail.fr"),
//!     "https://yopmail.com/en/?login=UserA123"
//! );
//!
//! let mut registry = ProviderRegistry::with_defaults();
//! registry.register(
//!     "mail.test",
//!     InboxProvider::new("http://127.0.0.1:8025/inbox/{address}", InboxLayout::yopmail()),
//! );
//! assert_eq!(
//!     registry.resolve("mail.test").inbox_url("u1", "mail.test"),
//!     "http://127.0.0.1:8025/inbox/u1@mail.test"
//! );
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Inbox URL used by every yopmail domain.
pub const YOPMAIL_INBOX_URL: &str = "https://yopmail.com/en/?login={prefix}";

/// The default disposable-mail domain.
pub const DEFAULT_DOMAIN: &str = "yopmail.com";

/// Domains served by the yopmail inbox.
pub const YOPMAIL_DOMAINS: &[&str] = &[
    "yopmail.com",
    "yopmail.fr",
    "yopmail.net",
    "cool.fr.nf",
    "jetable.fr.nf",
    "courriel.fr.nf",
    "moncourrier.fr.nf",
    "monemail.fr.nf",
    "monmail.fr.nf",
];

static KNOWN_PROVIDERS: LazyLock<HashMap<&'static str, InboxProvider>> = LazyLock::new(|| {
    let yopmail = InboxProvider::new(YOPMAIL_INBOX_URL, InboxLayout::yopmail());
    YOPMAIL_DOMAINS
        .iter()
        .map(|&domain| (domain, yopmail.clone()))
        .collect()
});

/// Selectors describing an inbox page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxLayout {
    /// One element per message in the listing, newest first.
    pub message_item: String,
    /// Subject text of each listing entry.
    pub message_subject: String,
    /// Sender text of each listing entry, if the listing shows one.
    pub message_sender: Option<String>,
    /// Attribute of `message_item` that identifies a message, if any.
    pub message_key_attribute: Option<String>,
    /// Control that reloads the listing, if any. Without one the inbox URL is
    /// navigated again.
    pub refresh: Option<String>,
    /// The rendered body of the opened message.
    pub message_body: String,
}

impl InboxLayout {
    /// Layout of the yopmail web inbox.
    #[must_use]
    pub fn yopmail() -> Self {
        Self {
            message_item: "div.m".to_string(),
            message_subject: "div.m .lms".to_string(),
            message_sender: Some("div.m .lmf".to_string()),
            message_key_attribute: Some("id".to_string()),
            refresh: Some("#refresh".to_string()),
            message_body: "#mail".to_string(),
        }
    }
}

/// An inbox URL template plus the page layout behind it.
///
/// The template may reference `{prefix}`, `{domain}` and `{address}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxProvider {
    url_template: String,
    layout: InboxLayout,
}

impl InboxProvider {
    /// Creates a provider.
    pub fn new(url_template: impl Into<String>, layout: InboxLayout) -> Self {
        Self {
            url_template: url_template.into(),
            layout,
        }
    }

    /// Fallback for unknown domains: yopmail layout served from the domain itself.
    #[must_use]
    pub fn fallback(domain: &str) -> Self {
        Self::new(
            format!("https://{domain}/?login={{prefix}}"),
            InboxLayout::yopmail(),
        )
    }

    /// Returns the URL template.
    #[must_use]
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Returns the page layout.
    #[must_use]
    pub fn layout(&self) -> &InboxLayout {
        &self.layout
    }

    /// Renders the inbox URL for a prefix on a domain.
    #[must_use]
    pub fn inbox_url(&self, prefix: &str, domain: &str) -> String {
        render_template(&self.url_template, prefix, domain)
    }
}

/// Renders `{prefix}`, `{domain}` and `{address}` placeholders.
///
/// Substituted values are percent-encoded and never re-scanned, so a prefix
/// such as `user+tag` or `{domain}` reaches the inbox exactly as registered.
pub(crate) fn render_template(template: &str, prefix: &str, domain: &str) -> String {
    let address = format!("{prefix}@{domain}");
    let placeholders = [
        ("{prefix}", prefix),
        ("{domain}", domain),
        ("{address}", address.as_str()),
    ];

    let mut rendered = String::with_capacity(template.len() + address.len() * 3);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];
        match placeholders
            .iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder))
        {
            Some((placeholder, value)) => {
                rendered.push_str(&urlencoding::encode(value));
                rest = &tail[placeholder.len()..];
            }
            None => {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

/// A customizable registry of disposable-mail providers.
///
/// Resolution order: custom registrations, then built-in defaults (if
/// enabled), then [`InboxProvider::fallback`]. Domains are case-insensitive.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    custom: HashMap<String, InboxProvider>,
    use_defaults: bool,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry without built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            use_defaults: false,
        }
    }

    /// Creates a registry that includes the built-in providers.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            custom: HashMap::new(),
            use_defaults: true,
        }
    }

    /// Registers a provider for a domain, overriding any existing one.
    pub fn register(&mut self, domain: impl Into<String>, provider: InboxProvider) {
        self.custom.insert(domain.into().to_lowercase(), provider);
    }

    /// Removes a custom registration.
    pub fn unregister(&mut self, domain: &str) -> Option<InboxProvider> {
        self.custom.remove(&domain.to_lowercase())
    }

    /// Resolves the provider for a domain.
    #[must_use]
    pub fn resolve(&self, domain: &str) -> Cow<'_, InboxProvider> {
        let domain = domain.to_lowercase();

        if let Some(provider) = self.custom.get(&domain) {
            return Cow::Borrowed(provider);
        }

        if self.use_defaults {
            if let Some(provider) = KNOWN_PROVIDERS.get(domain.as_str()) {
                return Cow::Owned(provider.clone());
            }
        }

        Cow::Owned(InboxProvider::fallback(&domain))
    }

    /// Returns `true` if the domain has a registered or built-in provider.
    #[must_use]
    pub fn is_known(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.custom.contains_key(&domain)
            || (self.use_defaults && KNOWN_PROVIDERS.contains_key(domain.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yopmail_alternate_domains_share_inbox() {
        let registry = ProviderRegistry::with_defaults();
        for domain in YOPMAIL_DOMAINS {
            assert!(registry.is_known(domain));
            assert_eq!(
                registry.resolve(domain).inbox_url("user1", domain),
                "https://yopmail.com/en/?login=user1"
            );
        }
    }

    #[test]
    fn test_unknown_domain_falls_back() {
        let registry = ProviderRegistry::with_defaults();
        assert!(!registry.is_known("example.org"));
        let provider = registry.resolve("example.org");
        assert_eq!(
            provider.inbox_url("user1", "example.org"),
            "https://example.org/?login=user1"
        );
        assert_eq!(provider.layout(), &InboxLayout::yopmail());
    }

    #[test]
    fn test_empty_registry_ignores_defaults() {
        let registry = ProviderRegistry::new();
        assert!(!registry.is_known("yopmail.com"));
        assert_eq!(
            registry.resolve("yopmail.com").url_template(),
            "https://yopmail.com/?login={prefix}"
        );
    }

    #[test]
    fn test_custom_registration_overrides_default() {
        let mut registry = ProviderRegistry::with_defaults();
        registry.register(
            "YOPMAIL.com",
            InboxProvider::new("http://localhost:9000/{prefix}", InboxLayout::yopmail()),
        );
        assert_eq!(
            registry.resolve("yopmail.com").inbox_url("abc", "yopmail.com"),
            "http://localhost:9000/abc"
        );

        registry.unregister("yopmail.com");
        assert_eq!(
            registry.resolve("yopmail.com").url_template(),
            YOPMAIL_INBOX_URL
        );
    }

    #[test]
    fn test_render_template_placeholders() {
        assert_eq!(
            render_template("https://{domain}/box/{address}?p={prefix}", "u1", "mail.test"),
            "https://mail.test/box/u1%40mail.test?p=u1"
        );
    }

    #[test]
    fn test_render_template_encodes_prefix() {
        let template = "https://yopmail.com/en/?login={prefix}";
        assert_eq!(
            render_template(template, "user+tag", "yopmail.com"),
            "https://yopmail.com/en/?login=user%2Btag"
        );
        assert_eq!(
            render_template(template, "victim&x=1", "yopmail.com"),
            "https://yopmail.com/en/?login=victim%26x%3D1"
        );
        assert_eq!(
            render_template(template, "a#b", "yopmail.com"),
            "https://yopmail.com/en/?login=a%23b"
        );
    }

    #[test]
    fn test_render_template_does_not_expand_substituted_values() {
        assert_eq!(
            render_template("https://{domain}/?login={prefix}", "{domain}", "mail.test"),
            "https://mail.test/?login=%7Bdomain%7D"
        );
        assert_eq!(
            render_template("https://x.test/?a={b}&login={prefix}", "u1", "mail.test"),
            "https://x.test/?a={b}&login=u1"
        );
    }
}
