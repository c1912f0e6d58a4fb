//! Opt-in exponential backoff for transient generation failures.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::warn;

use crate::commit::message::generate_message;
use crate::credential::ApiKey;
use crate::error::GenerationError;
use crate::gemini::client::MessageGenerator;

const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

/// Run `attempt` once, then up to `extra_attempts` more times while it fails
/// with a transient error. Permanent errors are returned immediately.
pub async fn retry_transient<T, Fut, F>(
    extra_attempts: u32,
    mut attempt: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        max_elapsed_time: None,
        ..Default::default()
    };

    let total = extra_attempts.saturating_add(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempts < total => {
                let wait = backoff
                    .next_backoff()
                    .unwrap_or(Duration::from_secs(MAX_INTERVAL_SECS));
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:.1}s",
                    attempts,
                    total,
                    e,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Generate and normalize a message, retrying transient failures.
pub async fn generate_with_retry<G>(
    generator: &G,
    prompt: &str,
    key: &ApiKey,
    extra_attempts: u32,
) -> Result<String, GenerationError>
where
    G: MessageGenerator + ?Sized,
{
    retry_transient(extra_attempts, || generate_message(generator, prompt, key)).await
}
