//! Synchronous entry point with an explicit execution-context lifecycle.
//!
//! A [`BlockingDownloader`] owns its own `tokio` runtime and transport. The
//! pair moves through [`ContextState::Created`] → [`ContextState::Active`] →
//! [`ContextState::Closed`]; a closed context is rebuilt, together with a
//! fresh transport, the next time a download is requested.
use crate::config::DownloadConfig;
use crate::downloader::{DownloadStats, Downloader};
use crate::error::{DownloadError, Result, TransportError};
use crate::observer::{NoopObserver, ProgressObserver};
use crate::transport::{ReqwestTransport, Transport};
use bytes::Bytes;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info};

/// How long [`BlockingDownloader::close`] waits for runtime tasks to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Nothing has been started yet.
    Created,
    /// Runtime and transport are live.
    Active,
    /// Runtime shut down and transport closed; will be rebuilt on next use.
    Closed,
}

enum Context<T: Transport> {
    Created,
    Active {
        runtime: Runtime,
        downloader: Downloader<T>,
    },
    Closed,
}

type Connect<T> = Box<dyn Fn(&DownloadConfig) -> Result<T, TransportError> + Send + Sync>;

pub struct BlockingDownloader<T: Transport = ReqwestTransport> {
    config: DownloadConfig,
    observer: Arc<dyn ProgressObserver>,
    connect: Connect<T>,
    context: Context<T>,
}

impl BlockingDownloader<ReqwestTransport> {
    pub fn new(config: DownloadConfig) -> Self {
        Self::with_transport_factory(config, |config| {
            ReqwestTransport::with_options(
                config.concurrency,
                config.timeout,
                config.user_agent.as_deref(),
            )
        })
    }
}

impl<T: Transport> BlockingDownloader<T> {
    /// `connect` is called each time the context is (re)activated. It runs
    /// inside the new runtime, so transports may spawn onto it.
    pub fn with_transport_factory<F>(config: DownloadConfig, connect: F) -> Self
    where
        F: Fn(&DownloadConfig) -> Result<T, TransportError> + Send + Sync + 'static,
    {
        Self {
            config,
            observer: Arc::new(NoopObserver),
            connect: Box::new(connect),
            context: Context::Created,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> ContextState {
        match self.context {
            Context::Created => ContextState::Created,
            Context::Active { .. } => ContextState::Active,
            Context::Closed => ContextState::Closed,
        }
    }

    /// Downloads `url`, blocking the calling thread.
    ///
    /// Must not be called from inside another async runtime.
    pub fn download(&mut self, url: &str) -> Result<Cursor<Bytes>> {
        self.download_with_stats(url).map(|(buf, _)| buf)
    }

    pub fn download_with_stats(&mut self, url: &str) -> Result<(Cursor<Bytes>, DownloadStats)> {
        self.activate()?;
        match &self.context {
            Context::Active {
                runtime,
                downloader,
            } => runtime.block_on(downloader.download_with_stats(url)),
            _ => Err(DownloadError::Transport(TransportError::Closed)),
        }
    }

    /// Closes the transport and shuts the runtime down.
    ///
    /// Safe to call (or to drop the downloader) from async code; the runtime
    /// is then shut down in the background instead of being waited on.
    pub fn close(&mut self) {
        if let Context::Active {
            runtime,
            downloader,
        } = std::mem::replace(&mut self.context, Context::Closed)
        {
            downloader.close();
            if Handle::try_current().is_ok() {
                // Blocking shutdown panics on a runtime thread.
                runtime.shutdown_background();
            } else {
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
            }
            debug!("execution context closed");
        }
    }

    fn activate(&mut self) -> Result<()> {
        match self.state() {
            ContextState::Active => return Ok(()),
            ContextState::Closed => info!("execution context was closed, starting a new one"),
            ContextState::Created => debug!("starting execution context"),
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(DownloadError::Runtime)?;
        let transport = {
            let _guard = runtime.enter();
            (self.connect)(&self.config).map_err(DownloadError::Transport)?
        };
        let downloader =
            Downloader::new(transport, self.config.clone()).with_observer(Arc::clone(&self.observer));

        self.context = Context::Active {
            runtime,
            downloader,
        };
        Ok(())
    }
}

impl<T: Transport> Drop for BlockingDownloader<T> {
    fn drop(&mut self) {
        self.close();
    }
}
