//! The generative-call boundary
//!
//! Every model call goes through [`GenerativeClient`] behind
//! [`generate_with_retry`]: bounded attempts with exponential backoff for
//! transient failures, immediate surfacing of content failures. Nothing
//! downstream ever sees a raw transport panic.

use async_trait::async_trait;
use rqa_model::{GenerationError, GenerationRequest, GenerationResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// External generative backend
///
/// Implementations wrap a model API; the engine treats them as fallible,
/// non-deterministic capabilities and never assumes referential
/// transparency.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Execute one generation request
    ///
    /// # Errors
    /// All failure modes map onto [`GenerationError`].
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;

    /// Label of the underlying model, for artifact provenance
    fn model_label(&self) -> Option<String> {
        None
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (minimum 1)
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds, doubled per retry
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Backoff before the retry following `attempt` (1-based)
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
        }
    }
}

/// Run a generation request under the retry policy
///
/// Only transient failures (timeout, transport) are retried; malformed or
/// refused responses abort immediately - replaying the identical request
/// would spend the budget for nothing. Cancellation aborts between and
/// during attempts.
///
/// # Errors
/// The final [`GenerationError`] after the attempt budget is exhausted.
pub async fn generate_with_retry(
    client: &Arc<dyn GenerativeClient>,
    request: &GenerationRequest,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<GenerationResponse, GenerationError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(GenerationError::Transport("cancelled".to_string()));
            }
            result = client.generate(request) => result,
        };

        match result {
            Ok(response) => return Ok(response),
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    template = %request.template,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "generation failed, retrying"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        return Err(GenerationError::Transport("cancelled".to_string()));
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyClient {
        calls: AtomicU32,
        fail_first: u32,
        error: GenerationError,
    }

    #[async_trait]
    impl GenerativeClient for FlakyClient {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GenerationResponse, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_first {
                Err(self.error.clone())
            } else {
                Ok(GenerationResponse::text("ok"))
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let client: Arc<dyn GenerativeClient> = Arc::new(FlakyClient {
            calls: AtomicU32::new(0),
            fail_first: 2,
            error: GenerationError::Transport("reset".to_string()),
        });
        let request = GenerationRequest::new("t", "p");
        let response =
            generate_with_retry(&client, &request, fast_policy(), &CancellationToken::new())
                .await
                .unwrap();
        assert_eq!(response.text, "ok");
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_error() {
        let client: Arc<dyn GenerativeClient> = Arc::new(FlakyClient {
            calls: AtomicU32::new(0),
            fail_first: 10,
            error: GenerationError::Timeout { elapsed_ms: 5 },
        });
        let request = GenerationRequest::new("t", "p");
        let error =
            generate_with_retry(&client, &request, fast_policy(), &CancellationToken::new())
                .await
                .unwrap_err();
        assert!(matches!(error, GenerationError::Timeout { .. }));
    }

    #[tokio::test]
    async fn content_failures_are_not_retried() {
        let client = Arc::new(FlakyClient {
            calls: AtomicU32::new(0),
            fail_first: 10,
            error: GenerationError::Refused("policy".to_string()),
        });
        let dyn_client: Arc<dyn GenerativeClient> = client.clone();
        let request = GenerationRequest::new("t", "p");
        let error = generate_with_retry(
            &dyn_client,
            &request,
            fast_policy(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(error, GenerationError::Refused(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_aborts_immediately() {
        let client: Arc<dyn GenerativeClient> = Arc::new(FlakyClient {
            calls: AtomicU32::new(0),
            fail_first: 0,
            error: GenerationError::Transport("unused".to_string()),
        });
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = GenerationRequest::new("t", "p");
        let error = generate_with_retry(&client, &request, fast_policy(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(error, GenerationError::Transport(message) if message == "cancelled"));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 100,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
    }
}
