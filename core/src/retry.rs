//! Retry classification and the retry loop owned by the cache layer.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::RetryPolicy;
use crate::result::{ApiFailure, FailureKind};

/// Whether an operation reads or writes; writes get fewer retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

impl RetryPolicy {
    /// Retries allowed after the first attempt.
    pub fn max_retries(&self, kind: OperationKind) -> u32 {
        match kind {
            OperationKind::Read => self.read_retries,
            OperationKind::Write => self.write_retries,
        }
    }

    /// Transport failures always retry; HTTP failures only when the status is
    /// allow-listed; validation and request failures never.
    pub fn is_retryable(&self, failure: &ApiFailure) -> bool {
        match failure.kind {
            FailureKind::Validation | FailureKind::Request => false,
            FailureKind::Transport => true,
            FailureKind::Http => match failure.status_code {
                None => true,
                Some(status) => self.retryable_statuses.contains(&status),
            },
        }
    }

    /// Delay before retry number `attempt` (0-based): `initial * 2^attempt`,
    /// capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

/// Run `op` until it succeeds, fails non-retryably, or the retry budget for
/// `kind` is spent. Sleeps on the tokio clock between attempts.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    kind: OperationKind,
    mut op: F,
) -> Result<T, ApiFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiFailure>>,
{
    let max = policy.max_retries(kind);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(failure) if attempt < max && policy.is_retryable(&failure) => {
                let delay = policy.backoff(attempt);
                debug!(
                    attempt = attempt + 1,
                    status = ?failure.status_code,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure.raw_error_message,
                    "retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(failure) => return Err(failure),
        }
    }
}
