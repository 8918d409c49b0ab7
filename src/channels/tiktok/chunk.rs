//! Chunk sizing for FILE_UPLOAD sources.
//!
//! TikTok requires every chunk except the last to be at least 5 MiB, so a
//! video smaller than that goes up as one chunk of its exact size.

use super::error::ChunkPlanError;
use serde::{Deserialize, Serialize};

pub const MIN_CHUNK_SIZE: u64 = 5 * 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkPlan {
    pub total_bytes: u64,
    pub chunk_size: u64,
    pub total_chunks: u32,
}

/// One contiguous byte range, `end` inclusive as in `Content-Range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: u32,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn content_range(&self, total_bytes: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total_bytes)
    }
}

pub fn plan(total_bytes: u64) -> Result<ChunkPlan, ChunkPlanError> {
    if total_bytes == 0 {
        return Err(ChunkPlanError::Empty);
    }

    if total_bytes < MIN_CHUNK_SIZE {
        return Ok(ChunkPlan {
            total_bytes,
            chunk_size: total_bytes,
            total_chunks: 1,
        });
    }

    Ok(ChunkPlan {
        total_bytes,
        chunk_size: DEFAULT_CHUNK_SIZE,
        total_chunks: total_bytes.div_ceil(DEFAULT_CHUNK_SIZE) as u32,
    })
}

impl ChunkPlan {
    pub fn range(&self, index: u32) -> Option<ChunkRange> {
        if index >= self.total_chunks {
            return None;
        }
        let start = index as u64 * self.chunk_size;
        let end = ((index as u64 + 1) * self.chunk_size - 1).min(self.total_bytes - 1);
        Some(ChunkRange { index, start, end })
    }

    pub fn ranges(&self) -> impl Iterator<Item = ChunkRange> + '_ {
        (0..self.total_chunks).filter_map(move |i| self.range(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn assert_contiguous(plan: &ChunkPlan) {
        let ranges: Vec<_> = plan.ranges().collect();
        assert_eq!(ranges.len() as u32, plan.total_chunks);
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges.last().unwrap().end, plan.total_bytes - 1);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
        let sum: u64 = ranges.iter().map(|r| r.len()).sum();
        assert_eq!(sum, plan.total_bytes);
        for r in &ranges[..ranges.len() - 1] {
            assert!(r.len() >= MIN_CHUNK_SIZE);
        }
    }

    #[test]
    fn test_zero_bytes_fails() {
        assert_eq!(plan(0), Err(ChunkPlanError::Empty));
    }

    #[test]
    fn test_small_video_is_single_chunk() {
        for size in [1, 1024, 3 * MIB, MIN_CHUNK_SIZE - 1] {
            let p = plan(size).unwrap();
            assert_eq!(p.total_chunks, 1);
            assert_eq!(p.chunk_size, size);
            assert_contiguous(&p);
        }
    }

    #[test]
    fn test_large_video_uses_default_chunk() {
        for size in [
            MIN_CHUNK_SIZE,
            10 * MIB,
            10 * MIB + 1,
            22 * MIB,
            100 * MIB,
            1024 * MIB + 17,
        ] {
            let p = plan(size).unwrap();
            assert_eq!(p.chunk_size, DEFAULT_CHUNK_SIZE);
            assert_eq!(p.total_chunks as u64, size.div_ceil(DEFAULT_CHUNK_SIZE));
            assert_contiguous(&p);
        }
    }

    #[test]
    fn test_22_mib_ranges() {
        let p = plan(22 * MIB).unwrap();
        let headers: Vec<_> = p.ranges().map(|r| r.content_range(p.total_bytes)).collect();
        assert_eq!(
            headers,
            vec![
                "bytes 0-10485759/23068672",
                "bytes 10485760-20971519/23068672",
                "bytes 20971520-23068671/23068672",
            ]
        );
        assert_eq!(p.range(2).unwrap().len(), 2 * MIB);
        assert!(p.range(3).is_none());
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let p = plan(20 * MIB).unwrap();
        assert_eq!(p.total_chunks, 2);
        assert_eq!(p.range(1).unwrap().len(), 10 * MIB);
    }
}
