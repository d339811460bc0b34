//! Chunk Planning Module
//!
//! Splits the common range of the two tracks into fixed-length,
//! non-overlapping windows that are aligned independently.

use std::ops::Range;
use crate::error::{AlignerError, Result};

/// One window of the shared sample range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTask {
    /// 0-based position in the plan, gap free
    pub chunk_idx: usize,
    pub start_sample: usize,
    /// Exclusive
    pub end_sample: usize,
}

impl ChunkTask {
    pub fn len(&self) -> usize {
        self.end_sample - self.start_sample
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start_sample..self.end_sample
    }
}

/// Fixed-length chunk planner
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    samples_per_chunk: usize,
}

impl ChunkPlanner {
    pub fn new(chunk_duration: f64, sample_rate: u32) -> Result<Self> {
        if !chunk_duration.is_finite() || chunk_duration <= 0.0 {
            return Err(AlignerError::config("Chunk duration must be greater than 0"));
        }

        let samples_per_chunk = (chunk_duration * sample_rate as f64) as usize;
        if samples_per_chunk == 0 {
            return Err(AlignerError::config(format!(
                "Chunk duration {}s is shorter than one sample at {} Hz", chunk_duration, sample_rate
            )));
        }

        Ok(Self { samples_per_chunk })
    }

    pub fn samples_per_chunk(&self) -> usize {
        self.samples_per_chunk
    }

    /// Shortest trailing window still worth correlating
    pub fn min_chunk_samples(&self) -> usize {
        self.samples_per_chunk / 4
    }

    /// Plan windows over `[0, min(reference_len, secondary_len))`.
    ///
    /// The stride is always the nominal chunk size. A trailing window shorter
    /// than a quarter chunk is dropped unless it would be the only chunk.
    pub fn plan(&self, reference_len: usize, secondary_len: usize) -> Vec<ChunkTask> {
        let min_len = reference_len.min(secondary_len);
        let min_chunk = self.min_chunk_samples();
        let mut chunks = Vec::with_capacity(min_len / self.samples_per_chunk + 1);

        for (chunk_idx, start) in (0..min_len).step_by(self.samples_per_chunk).enumerate() {
            let end = (start + self.samples_per_chunk).min(min_len);

            if end - start < min_chunk && chunk_idx > 0 {
                log::debug!(
                    "Dropping trailing window [{}, {}) shorter than {} samples",
                    start, end, min_chunk
                );
                break;
            }

            chunks.push(ChunkTask { chunk_idx, start_sample: start, end_sample: end });
        }

        chunks
    }
}
