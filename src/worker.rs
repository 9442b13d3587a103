use crate::error::{AttemptError, ChunkFetchError, TransportError};
use crate::observer::ProgressObserver;
use crate::retry::RetryPolicy;
use crate::state::Chunk;
use crate::transport::Transport;
use reqwest::header::{HeaderValue, RANGE};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Downloads a single chunk into `slice` with bounded, jittered retries.
///
/// `slice` must be exactly `chunk.len()` bytes long; it is only written once
/// a response of exactly that length has been received, so a failed or short
/// attempt never leaves partial data behind. Error statuses and length
/// mismatches are retried the same way as transport failures.
pub async fn download_chunk<T: Transport>(
    transport: &T,
    url: &str,
    chunk: Chunk,
    slice: &mut [u8],
    policy: RetryPolicy,
    retries: &AtomicU32,
    observer: &dyn ProgressObserver,
) -> Result<(), ChunkFetchError> {
    debug_assert_eq!(slice.len() as u64, chunk.len());

    let fail = |attempts: u32, source: AttemptError| ChunkFetchError {
        index: chunk.index,
        start: chunk.start,
        end: chunk.end,
        attempts,
        source,
    };

    let range = HeaderValue::try_from(chunk.range_header())
        .map_err(|e| fail(0, TransportError::Request(e.to_string()).into()))?;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            retries.fetch_add(1, Ordering::Relaxed);
            observer.message(format!("Chunk {}: retry #{}", chunk.index, attempt));
        }
        let mut headers = RetryPolicy::attempt_headers(attempt);
        headers.insert(RANGE, range.clone());

        let result = async {
            let response = transport.get(url, headers).await?;

            if response.is_error_status() {
                return Err(AttemptError::Status(response.status));
            }
            let received = response.body.len() as u64;
            if received != chunk.len() {
                return Err(AttemptError::LengthMismatch {
                    expected: chunk.len(),
                    actual: received,
                });
            }

            slice.copy_from_slice(&response.body);
            Ok::<(), AttemptError>(())
        }
        .await;

        attempt += 1;

        match result {
            Ok(()) => {
                debug!(chunk = chunk.index, start = chunk.start, end = chunk.end, attempt, "chunk done");
                observer.inc(chunk.len());
                return Ok(());
            }
            Err(e) => {
                warn!(chunk = chunk.index, attempt, error = %e, "chunk attempt failed");
                if !e.is_retryable() || attempt >= policy.max_attempts {
                    observer.message(format!("Chunk {} failed: {}", chunk.index, e));
                    return Err(fail(attempt, e));
                }
                policy.backoff().await;
            }
        }
    }
}
