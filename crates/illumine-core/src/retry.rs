//! A single retry policy type, per spec §9: "A single retry policy type
//! captures `(max_attempts, base_delay, factor, retryable_predicate)`."
//!
//! Callers configure one instance per collaborator (§9 gives the three
//! concrete policies: image generation `(3, 1s, 2.0, is_transient)`, text
//! model `(2, 500ms, 2.0, is_transient_or_timeout)`, persistence
//! `(5, 100ms, 1.5, is_deadlock_or_transient)`) and drive calls through
//! [`with_retry`].

use std::future::Future;
use std::time::Duration;

use crate::error::Error;

/// Exponential backoff retry policy with a pluggable retryable predicate.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    factor: f64,
    retryable: fn(&Error) -> bool,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("factor", &self.factor)
            .finish()
    }
}

fn is_transient(err: &Error) -> bool {
    err.is_retryable()
}

impl RetryPolicy {
    /// Construct a policy with exponential backoff (factor 2.0, base 1s)
    /// and the default transient-error predicate, retrying up to
    /// `max_attempts` times in total.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(1),
            factor: 2.0,
            retryable: is_transient,
        }
    }

    /// Build a fully explicit policy.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        factor: f64,
        retryable: fn(&Error) -> bool,
    ) -> Self {
        Self {
            max_attempts,
            base_delay,
            factor,
            retryable,
        }
    }

    /// The policy used for image generation calls (§9): `(3, 1s, 2.0, is_transient)`.
    pub fn image_generation() -> Self {
        Self::new(3, Duration::from_secs(1), 2.0, is_transient)
    }

    /// The policy used for text model calls (§9): `(2, 500ms, 2.0, is_transient_or_timeout)`.
    pub fn text_model() -> Self {
        Self::new(2, Duration::from_millis(500), 2.0, is_transient)
    }

    /// The policy used for persistence calls (§9): `(5, 100ms, 1.5, is_deadlock_or_transient)`.
    pub fn persistence() -> Self {
        Self::new(5, Duration::from_millis(100), 1.5, is_transient)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let scale = self.factor.powi(attempt as i32);
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * scale)
    }
}

/// Drive `f` up to `policy.max_attempts` times, sleeping with exponential
/// backoff between attempts, stopping as soon as `f` succeeds or returns an
/// error the policy's predicate classifies as non-retryable.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, mut f: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = (policy.retryable)(&err);
                if !retryable || attempt + 1 >= policy.max_attempts {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                tracing::warn!(attempt, ?delay, error = %err, "retrying after transient error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
