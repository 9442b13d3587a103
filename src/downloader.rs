//! Download orchestration: probe, plan, fan out, fan in.
use crate::config::{DownloadConfig, FailurePolicy};
use crate::error::{ChunkFetchError, DownloadError, Result, TransportError};
use crate::observer::{NoopObserver, ProgressObserver};
use crate::planner::calculate_chunks;
use crate::probe::probe;
use crate::state::{ChunkPlan, DownloadTarget};
use crate::transport::{ReqwestTransport, Transport};
use crate::utils;
use crate::worker::download_chunk;
use bytes::{Bytes, BytesMut};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Summary of a finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadStats {
    pub resolved_url: String,
    pub size: u64,
    pub elapsed: Duration,
    /// Chunks actually fetched in parallel.
    pub concurrency: usize,
    pub chunk_size: u64,
    /// Retried attempts across the probe and every chunk.
    pub retries: u32,
}

/// Fetches a remote file as concurrent byte ranges into one in-memory buffer.
///
/// The transport is injected and shared by every chunk task. Call
/// [`Downloader::close`] when done to release it.
pub struct Downloader<T: Transport> {
    transport: Arc<T>,
    config: DownloadConfig,
    observer: Arc<dyn ProgressObserver>,
}

impl Downloader<ReqwestTransport> {
    /// Builds a `reqwest` transport whose connection limit matches the
    /// configured concurrency.
    pub fn from_config(config: DownloadConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::with_options(
            config.concurrency,
            config.timeout,
            config.user_agent.as_deref(),
        )?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> Downloader<T> {
    pub fn new(transport: T, config: DownloadConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Closes the underlying transport. Later downloads fail fast.
    pub fn close(&self) {
        debug!("closing transport");
        self.transport.close();
    }

    /// Downloads `url` and returns its content positioned at offset 0.
    pub async fn download(&self, url: &str) -> Result<Cursor<Bytes>> {
        self.download_with_stats(url).await.map(|(buf, _)| buf)
    }

    /// Like [`download`](Self::download), also returning timing and retry figures.
    pub async fn download_with_stats(&self, url: &str) -> Result<(Cursor<Bytes>, DownloadStats)> {
        let started = Instant::now();
        let retries = Arc::new(AtomicU32::new(0));

        let target = probe(&*self.transport, url, self.config.probe_retry, &retries).await?;
        let plan = calculate_chunks(target.size, self.config.concurrency);
        debug!(
            size = target.size,
            requested = self.config.concurrency,
            concurrency = plan.concurrency,
            chunk_size = plan.chunk_size,
            "planned chunks"
        );

        self.observer.start(target.size);
        let data = self.fetch_chunks(&target, &plan, &retries).await?;

        let stats = DownloadStats {
            resolved_url: target.resolved_url.clone(),
            size: target.size,
            elapsed: started.elapsed(),
            concurrency: plan.concurrency,
            chunk_size: plan.chunk_size,
            retries: retries.load(Ordering::Relaxed),
        };
        info!(
            "Downloaded {} as {} {} kB chunks in {:.4}s with {} retries",
            utils::get_filename_from_url(&stats.resolved_url),
            stats.concurrency,
            stats.chunk_size / 1024,
            stats.elapsed.as_secs_f64(),
            stats.retries
        );
        self.observer.finish();

        Ok((Cursor::new(data), stats))
    }

    /// Fans out one task per chunk and joins them.
    ///
    /// The zeroed buffer is split into one owned piece per chunk before any
    /// task starts. Each task gets exclusive ownership of its piece, and the
    /// pieces are rejoined in index order once every chunk has succeeded.
    async fn fetch_chunks(
        &self,
        target: &DownloadTarget,
        plan: &ChunkPlan,
        retries: &Arc<AtomicU32>,
    ) -> Result<Bytes> {
        let size = usize::try_from(target.size).map_err(|_| DownloadError::TooLarge(target.size))?;
        let mut buffer = BytesMut::zeroed(size);
        let mut tasks = JoinSet::new();

        for chunk in plan.chunks.iter().copied() {
            let mut piece = buffer.split_to(chunk.len() as usize);
            let transport = Arc::clone(&self.transport);
            let observer = Arc::clone(&self.observer);
            let retries = Arc::clone(retries);
            let url = target.resolved_url.clone();
            let policy = self.config.fetch_retry;

            tasks.spawn(async move {
                download_chunk(
                    &*transport,
                    &url,
                    chunk,
                    &mut piece,
                    policy,
                    &retries,
                    &*observer,
                )
                .await?;
                Ok::<_, ChunkFetchError>((chunk.index, piece))
            });
        }
        debug_assert!(buffer.is_empty(), "chunk plan must cover the whole buffer");

        let mut pieces: Vec<Option<BytesMut>> = (0..plan.chunks.len()).map(|_| None).collect();
        let mut first_error: Option<DownloadError> = None;

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(Ok(done)) => Ok(done),
                Ok(Err(e)) => Err(DownloadError::from(e)),
                Err(e) => Err(DownloadError::from(e)),
            };

            match outcome {
                Ok((index, piece)) => pieces[index] = Some(piece),
                Err(e) if first_error.is_some() => {
                    debug!(error = %e, "additional chunk failure");
                }
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::FailFast => {
                        warn!(error = %e, "chunk failed, cancelling remaining chunks");
                        tasks.shutdown().await;
                        return Err(e);
                    }
                    FailurePolicy::Drain => {
                        warn!(error = %e, "chunk failed, waiting for remaining chunks");
                        first_error = Some(e);
                    }
                },
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let mut assembled = BytesMut::new();
        for piece in pieces.into_iter().flatten() {
            assembled.unsplit(piece);
        }
        debug_assert_eq!(assembled.len(), size);

        Ok(assembled.freeze())
    }
}
