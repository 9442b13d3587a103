//! Splitting a resource into byte ranges.
use crate::state::{Chunk, ChunkPlan};

/// Chunks smaller than this are not worth a separate request.
pub const MIN_CHUNK_SIZE: u64 = 1 << 10;

/// Divides a total file size into equal-sized chunks for concurrent downloading.
///
/// The last chunk will automatically expand to cover any remainder bytes. When
/// an even split would give chunks under [`MIN_CHUNK_SIZE`], the whole file is
/// fetched as one chunk. An empty file yields an empty plan.
///
/// The returned chunks always partition `[0, total_size)` exactly; the
/// downloader relies on that to write into the shared buffer without locks.
pub fn calculate_chunks(total_size: u64, concurrency: usize) -> ChunkPlan {
    let requested = concurrency.max(1) as u64;

    if total_size == 0 {
        return ChunkPlan {
            chunks: Vec::new(),
            concurrency: 1,
            chunk_size: 0,
        };
    }

    let chunk_size = total_size / requested;
    if chunk_size < MIN_CHUNK_SIZE {
        return ChunkPlan {
            chunks: vec![Chunk {
                index: 0,
                start: 0,
                end: total_size - 1,
            }],
            concurrency: 1,
            chunk_size: total_size,
        };
    }

    let chunks = (0..requested)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i == requested - 1 {
                total_size - 1
            } else {
                start + chunk_size - 1
            };
            Chunk {
                index: i as usize,
                start,
                end,
            }
        })
        .collect();

    ChunkPlan {
        chunks,
        concurrency: requested as usize,
        chunk_size,
    }
}
