//! Size probe: resolves the final URL and total length with a HEAD request.
use crate::error::{AttemptError, ProbeError};
use crate::retry::RetryPolicy;
use crate::state::DownloadTarget;
use crate::transport::Transport;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Fetches the Content-Length and redirect target of a URL using a HEAD request.
///
/// An HTTP error status is logged but is not fatal on its own; the attempt
/// only fails when the final response has no usable `Content-Length` or the
/// transport errors out. Failed attempts are retried after a jittered delay
/// until `policy` is exhausted. Each retried attempt bumps `retries`.
///
/// # Errors
///
/// Returns [`ProbeError`] once every attempt has failed, or immediately if the
/// transport has been closed.
pub async fn probe<T: Transport>(
    transport: &T,
    url: &str,
    policy: RetryPolicy,
    retries: &AtomicU32,
) -> Result<DownloadTarget, ProbeError> {
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            retries.fetch_add(1, Ordering::Relaxed);
        }
        let headers = RetryPolicy::attempt_headers(attempt);
        let started = Instant::now();

        let result = async {
            let response = transport.head(url, headers).await?;
            if response.is_error_status() {
                warn!(
                    url,
                    status = response.status,
                    headers = ?response.headers,
                    "HEAD returned an error status"
                );
            }
            let size = response
                .content_length()
                .ok_or(AttemptError::MissingLength)?;

            Ok::<_, AttemptError>(DownloadTarget {
                url: url.to_string(),
                resolved_url: response.url,
                size,
            })
        }
        .await;

        attempt += 1;

        match result {
            Ok(target) => {
                debug!(
                    url,
                    resolved = %target.resolved_url,
                    size = target.size,
                    attempt,
                    "probe succeeded"
                );
                return Ok(target);
            }
            Err(e) => {
                warn!(
                    url,
                    attempt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "HEAD failed"
                );
                if !e.is_retryable() || attempt >= policy.max_attempts {
                    return Err(ProbeError {
                        url: url.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
                policy.backoff().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::retry::RETRY_COUNT;
    use crate::transport::testing::MockTransport;
    use std::time::Duration;

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn follows_redirect_to_resolved_url() {
        let transport = MockTransport::new("http://mirror/file.bin", vec![1u8; 10_000]);
        let retries = AtomicU32::new(0);

        let target = probe(&transport, "http://origin/file.bin", quick(3), &retries)
            .await
            .unwrap();

        assert_eq!(target.url, "http://origin/file.bin");
        assert_eq!(target.resolved_url, "http://mirror/file.bin");
        assert_eq!(target.size, 10_000);
        assert_eq!(retries.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn retries_transient_failures_with_retry_header() {
        let transport = MockTransport::new("http://a/f", vec![0u8; 64]).fail_heads(2);
        let retries = AtomicU32::new(0);

        let target = probe(&transport, "http://a/f", quick(3), &retries)
            .await
            .unwrap();
        assert_eq!(target.size, 64);
        assert_eq!(retries.load(Ordering::Relaxed), 2);

        let heads = transport.recorded("HEAD");
        assert_eq!(heads.len(), 3);
        assert!(heads[0].headers.get(RETRY_COUNT).is_none());
        assert_eq!(heads[1].headers.get(RETRY_COUNT).unwrap(), "1");
        assert_eq!(heads[2].headers.get(RETRY_COUNT).unwrap(), "2");
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let transport = MockTransport::new("http://a/f", vec![0u8; 64]).fail_heads(10);
        let retries = AtomicU32::new(0);

        let err = probe(&transport, "http://a/f", quick(3), &retries)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 3);
        assert!(matches!(
            err.source,
            AttemptError::Transport(TransportError::Timeout)
        ));
        assert_eq!(transport.recorded("HEAD").len(), 3);
    }

    #[tokio::test]
    async fn missing_length_is_retried_like_a_network_error() {
        let mut transport = MockTransport::new("http://a/f", vec![0u8; 64]);
        transport.omit_length = true;
        let retries = AtomicU32::new(0);

        let err = probe(&transport, "http://a/f", quick(3), &retries)
            .await
            .unwrap_err();
        assert!(matches!(err.source, AttemptError::MissingLength));
        assert_eq!(err.attempts, 3);
    }

    #[tokio::test]
    async fn error_status_with_length_still_resolves() {
        let mut transport = MockTransport::new("http://a/f", vec![0u8; 64]);
        transport.head_status = 404;
        let retries = AtomicU32::new(0);

        let target = probe(&transport, "http://a/f", quick(3), &retries)
            .await
            .unwrap();
        assert_eq!(target.size, 64);
    }

    #[tokio::test]
    async fn closed_transport_fails_without_retrying() {
        let transport = MockTransport::new("http://a/f", vec![0u8; 64]);
        transport.close();
        let retries = AtomicU32::new(0);

        let err = probe(&transport, "http://a/f", quick(3), &retries)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(matches!(
            err.source,
            AttemptError::Transport(TransportError::Closed)
        ));
    }
}
