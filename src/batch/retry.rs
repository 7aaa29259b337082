use crate::provider::ProviderError;
use std::time::Duration;
use tokio::time::sleep;

/// One automatic retry for transient provider failures, after a brief
/// fixed backoff. Everything else fails immediately.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    max_retries: u8,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn single() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(750),
        }
    }

    pub fn should_retry(&self, attempt: u8, error: &ProviderError) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    pub async fn wait(&self) {
        tracing::info!("retrying in {:?}", self.backoff);
        sleep(self.backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_retry_once() {
        let policy = RetryPolicy::single();
        assert!(policy.should_retry(0, &ProviderError::RateLimited));
        assert!(policy.should_retry(0, &ProviderError::NetworkFailure("reset".to_string())));
        assert!(!policy.should_retry(1, &ProviderError::RateLimited));
    }

    #[test]
    fn fatal_errors_never_retry() {
        let policy = RetryPolicy::single();
        assert!(!policy.should_retry(0, &ProviderError::AuthFailed));
        assert!(!policy.should_retry(0, &ProviderError::QuotaExceeded));
        assert!(!policy.should_retry(0, &ProviderError::Unknown("?".to_string())));
    }
}
