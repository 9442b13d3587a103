//! Per-download values: the probed target and its planned chunks.
//!
//! Everything here lives for a single `download` call and is dropped once the
//! buffer has been handed back.

/// The resource being downloaded, as discovered by the size probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// URL the caller asked for.
    pub url: String,
    /// Final URL after redirects. Every chunk GET goes here.
    pub resolved_url: String,
    /// Total size in bytes.
    pub size: u64,
}

/// A specific range of bytes within the resource.
///
/// The range is inclusive, meaning `start` and `end` are both part of the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Index of the chunk
    pub index: usize,
    /// The starting byte index (0-based).
    pub start: u64,
    /// The ending byte index.
    pub end: u64,
}

#[allow(clippy::len_without_is_empty)]
impl Chunk {
    /// Number of bytes covered. Never zero.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Range` request header.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Output of the chunk planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Disjoint chunks ordered by offset.
    pub chunks: Vec<Chunk>,
    /// Number of chunks actually fetched in parallel.
    pub concurrency: usize,
    /// Nominal chunk size; the last chunk may be larger.
    pub chunk_size: u64,
}
