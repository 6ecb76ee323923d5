//! Live tests for the Chromium backend.
//!
//! These need a local Chrome/Chromium and network access to the public
//! inbox, so they are disabled by default. To run them:
//!
//! ```bash
//! # Optional: a prefix whose inbox already holds a verification email
//! export MFA_TEST_PREFIX="qa-run-42"
//! export MFA_TEST_EXPECTED_CODE="483920"
//!
//! cargo test --features integration-tests -- --ignored
//! ```

#![cfg(feature = "integration-tests")]

use mfa_extractor::chromium::ChromiumContext;
use mfa_extractor::{ErrorKind, ExtractorConfig, MfaExtractor};
use std::env;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Test Configuration Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn seeded_inbox() -> Option<(String, String)> {
    dotenvy::dotenv().ok();
    let prefix = env::var("MFA_TEST_PREFIX").ok()?;
    let code = env::var("MFA_TEST_EXPECTED_CODE").ok()?;
    Some((prefix, code))
}

fn short_extractor() -> MfaExtractor {
    let config = ExtractorConfig::builder()
        .poll_interval(Duration::from_secs(3))
        .max_wait(Duration::from_secs(15))
        .build()
        .expect("valid config");
    MfaExtractor::new(config)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires Chrome and network access"]
async fn test_empty_inbox_times_out_and_closes_tab() {
    let context = ChromiumContext::launch_headless()
        .await
        .expect("browser launches");
    let (_form_page, origin) = context
        .origin_page("about:blank")
        .await
        .expect("origin page opens");
    let extractor = short_extractor();
    let address = extractor.generate_address().expect("address");

    let pages_before = context.browser().pages().await.expect("pages").len();
    let err = extractor
        .extract_code(&context, &origin, address.prefix())
        .await
        .unwrap_err();
    let pages_after = context.browser().pages().await.expect("pages").len();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(pages_before, pages_after);
}

#[tokio::test]
#[ignore = "requires Chrome, network access and a seeded inbox"]
async fn test_seeded_inbox_returns_code() {
    let Some((prefix, expected)) = seeded_inbox() else {
        eprintln!("Skipping: MFA_TEST_PREFIX / MFA_TEST_EXPECTED_CODE not set");
        return;
    };

    let context = ChromiumContext::launch_headless()
        .await
        .expect("browser launches");
    let (_form_page, origin) = context
        .origin_page("about:blank")
        .await
        .expect("origin page opens");

    let code = short_extractor()
        .extract_code(&context, &origin, &prefix)
        .await
        .expect("code extracted");

    assert_eq!(code.as_str(), expected);
}
