//! Demo: extracting codes that are not six digits.
//!
//! Shows the matcher options:
//! - `OtpMatcher::n_digit` for numeric codes of another length
//! - `RegexMatcher` for pattern-based extraction
//! - `ClosureMatcher` for arbitrary logic
//!
//! # Usage
//!
//! ```bash
//! export MFA_ADDRESS_PREFIX="qa-run-42"
//! cargo run --example custom_matcher --features chromium
//! ```

use mfa_extractor::chromium::ChromiumContext;
use mfa_extractor::matcher::{ClosureMatcher, Matcher, MessageFilter, OtpMatcher, RegexMatcher};
use mfa_extractor::{ExtractorConfig, MfaExtractor};
use std::borrow::Cow;
use std::env;
use std::time::Duration;

/// Alphanumeric tokens such as "X7K2-P9QA".
fn dashed_token_matcher() -> Result<RegexMatcher, regex::Error> {
    RegexMatcher::with_description(r"\b([A-Z0-9]{4}-[A-Z0-9]{4})\b", "dashed token")
}

/// The value on the line after "Your code:".
fn next_line_matcher() -> impl Matcher {
    ClosureMatcher::new(
        |text| {
            let mut lines = text.lines();
            lines
                .by_ref()
                .find(|line| line.trim().eq_ignore_ascii_case("your code:"))?;
            lines
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(Cow::Borrowed)
        },
        "code on the line after 'Your code:'",
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let prefix = env::var("MFA_ADDRESS_PREFIX")?;

    let config = ExtractorConfig::builder()
        .message_filter(MessageFilter::subject(r"(?i)sign.?in|login")?)
        .code_matcher(OtpMatcher::n_digit(8))
        .max_wait(Duration::from_secs(60))
        .build()?;
    let extractor = MfaExtractor::new(config);

    let context = ChromiumContext::launch_headless().await?;
    let (_form_page, origin) = context.origin_page("about:blank").await?;

    println!("1. Configured matcher ({})...", extractor.config().code_matcher().description());
    match extractor.extract_code(&context, &origin, &prefix).await {
        Ok(code) => println!("   Found: {code}"),
        Err(e) => println!("   {e}"),
    }

    println!("\n2. Dashed token...");
    let dashed = dashed_token_matcher()?;
    match extractor
        .extract_with(&context, &origin, &prefix, &dashed)
        .await
    {
        Ok(code) => println!("   Found: {code}"),
        Err(e) => println!("   {e}"),
    }

    println!("\n3. Line after 'Your code:'...");
    match extractor
        .extract_with(&context, &origin, &prefix, &next_line_matcher())
        .await
    {
        Ok(code) => println!("   Found: {code}"),
        Err(e) => println!("   {e}"),
    }

    println!("\nDone!");
    Ok(())
}
