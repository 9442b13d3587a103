//! # segfetch
//!
//! `segfetch` downloads a single remote file faster than one sequential
//! stream. It:
//! - probes the size and final (post-redirect) URL with a HEAD request
//! - splits the file into disjoint byte ranges
//! - fetches the ranges concurrently with `Range` GETs into one buffer
//! - retries transient failures with jittered backoff
//!
//! ## Example Usage
//!
//! ```no_run
//! use segfetch::{DownloadConfig, Downloader};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::from_config(DownloadConfig::default().with_concurrency(8))?;
//! let buffer = downloader.download("https://example.com/archive.tar.gz").await?;
//! println!("{} bytes", buffer.get_ref().len());
//! downloader.close();
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod config;
pub mod downloader;
pub mod error;
pub mod observer;
pub mod planner;
pub mod probe;
pub mod retry;
pub mod runtime;
pub mod state;
pub mod transport;
pub mod utils;
pub mod worker;

pub use args::Args;
pub use config::{DownloadConfig, FailurePolicy, Settings};
pub use downloader::{DownloadStats, Downloader};
pub use error::{ChunkFetchError, DownloadError, ProbeError, TransportError};
pub use observer::{ConsoleObserver, NoopObserver, ProgressObserver};
pub use planner::calculate_chunks;
pub use retry::RetryPolicy;
pub use runtime::{BlockingDownloader, ContextState};
pub use state::{Chunk, ChunkPlan, DownloadTarget};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
pub use worker::download_chunk;
