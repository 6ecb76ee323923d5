//! Demo: one extraction with structured logging enabled.
//!
//! Launches a headless Chromium, opens the onboarding page as the origin,
//! prints a fresh disposable address, and waits for the verification email
//! sent to it. Every step emits `tracing` spans and events.
//!
//! # Usage
//!
//! ```bash
//! export MFA_SIGNUP_URL="https://onboarding.example/signup"
//! # Reuse an address you already registered instead of generating one
//! export MFA_ADDRESS_PREFIX="qa-run-42"
//! # Set log level (trace, debug, info, warn, error)
//! export RUST_LOG=mfa_extractor=debug
//!
//! cargo run --example with_tracing --features chromium
//! ```

use mfa_extractor::chromium::ChromiumContext;
use mfa_extractor::{ExtractorConfig, MfaExtractor};
use std::env;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mfa_extractor=info")),
        )
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let signup_url = env::var("MFA_SIGNUP_URL").unwrap_or_else(|_| "about:blank".to_string());

    let config = ExtractorConfig::builder()
        .poll_interval(Duration::from_secs(3))
        .max_wait(Duration::from_secs(120))
        .build()?;
    let extractor = MfaExtractor::new(config);

    let context = ChromiumContext::launch_headless().await?;
    let (_form_page, origin) = context.origin_page(&signup_url).await?;

    let address = match env::var("MFA_ADDRESS_PREFIX") {
        Ok(prefix) => extractor.config().address(&prefix)?,
        Err(_) => extractor.generate_address()?,
    };

    tracing::info!(address = %address, "Register this address on the signup page");
    println!("Waiting for a verification email to {address}");

    match extractor
        .extract_code(&context, &origin, address.prefix())
        .await
    {
        Ok(code) => {
            tracing::info!(code_len = code.as_str().len(), "Extraction succeeded");
            println!("\nVerification code: {code}");
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = %e.kind(), "Extraction failed");
            println!("\nNo code: {e}");
        }
    }

    Ok(())
}
