//! Error types for the downloader.
//!
//! Transient transport failures are retried locally and never reach the
//! caller on their own; only an exhausted retry budget (or a closed
//! transport) surfaces as a [`ProbeError`] or [`ChunkFetchError`].
use thiserror::Error;

/// Failure of a single request issued through a [`Transport`](crate::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("transport is closed")]
    Closed,
}

impl TransportError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Closed)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Why a single probe or fetch attempt was rejected.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("response has no usable Content-Length header")]
    MissingLength,

    #[error("server answered with HTTP {0}")]
    Status(u16),

    #[error("expected {expected} bytes, received {actual}")]
    LengthMismatch { expected: u64, actual: u64 },
}

impl AttemptError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Transport(e) => e.is_retryable(),
            _ => true,
        }
    }
}

/// The size probe gave up.
#[derive(Debug, Error)]
#[error("failed to HEAD {url} after {attempts} attempt(s): {source}")]
pub struct ProbeError {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub source: AttemptError,
}

/// One byte range could not be fetched.
#[derive(Debug, Error)]
#[error("failed to fetch chunk {index} (bytes {start}-{end}) after {attempts} attempt(s): {source}")]
pub struct ChunkFetchError {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub attempts: u32,
    #[source]
    pub source: AttemptError,
}

/// Top-level failure of a download.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Chunk(#[from] ChunkFetchError),

    #[error("resource of {0} bytes does not fit in memory")]
    TooLarge(u64),

    #[error("chunk task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to build the HTTP transport: {0}")]
    Transport(#[source] TransportError),
}

pub type Result<T, E = DownloadError> = std::result::Result<T, E>;
