//! Read-only PCM storage shared by every chunk worker

use std::sync::Arc;
use crate::error::{AlignerError, Result};
use super::planner::ChunkTask;

/// Reference and secondary tracks at one sample rate.
///
/// Samples are frozen at construction; clones share the same allocation, so
/// workers on any thread read them without locking.
#[derive(Debug, Clone)]
pub struct SharedSampleBuffer {
    reference: Arc<[f32]>,
    secondary: Arc<[f32]>,
    sample_rate: u32,
}

/// Both tracks' samples for one chunk
#[derive(Debug, Clone, Copy)]
pub struct ChunkSamples<'a> {
    pub reference: &'a [f32],
    pub secondary: &'a [f32],
}

impl SharedSampleBuffer {
    pub fn new(reference: Vec<f32>, secondary: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            reference: reference.into(),
            secondary: secondary.into(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn reference(&self) -> &[f32] {
        &self.reference
    }

    pub fn secondary(&self) -> &[f32] {
        &self.secondary
    }

    pub fn reference_len(&self) -> usize {
        self.reference.len()
    }

    pub fn secondary_len(&self) -> usize {
        self.secondary.len()
    }

    /// Slice both tracks over the chunk's window
    pub fn chunk(&self, task: &ChunkTask) -> Result<ChunkSamples<'_>> {
        let range = task.range();
        match (self.reference.get(range.clone()), self.secondary.get(range)) {
            (Some(reference), Some(secondary)) => Ok(ChunkSamples { reference, secondary }),
            _ => Err(AlignerError::chunk(
                task.chunk_idx,
                format!(
                    "Window [{}, {}) exceeds track lengths ({}, {})",
                    task.start_sample,
                    task.end_sample,
                    self.reference.len(),
                    self.secondary.len()
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn buffer() -> SharedSampleBuffer {
        SharedSampleBuffer::new(
            (0..10).map(|i| i as f32).collect(),
            (0..8).map(|i| -(i as f32)).collect(),
            1000,
        )
    }

    #[test]
    fn test_chunk_slices() {
        let buffer = buffer();
        let task = ChunkTask { chunk_idx: 1, start_sample: 4, end_sample: 8 };
        let chunk = buffer.chunk(&task).unwrap();

        assert_eq!(chunk.reference, &[4.0, 5.0, 6.0, 7.0]);
        assert_eq!(chunk.secondary, &[-4.0, -5.0, -6.0, -7.0]);
    }

    #[test]
    fn test_out_of_range_chunk() {
        let buffer = buffer();
        let task = ChunkTask { chunk_idx: 3, start_sample: 6, end_sample: 9 };

        match buffer.chunk(&task) {
            Err(AlignerError::Chunk { chunk_idx, .. }) => assert_eq!(chunk_idx, 3),
            other => panic!("expected chunk error, got {:?}", other),
        }
    }

    #[test]
    fn test_clones_share_storage() {
        let buffer = buffer();
        let handles: Vec<_> = (0..4).map(|_| buffer.clone()).collect();
        assert_eq!(Arc::strong_count(&buffer.reference), 5);
        assert!(std::ptr::eq(handles[0].reference().as_ptr(), buffer.reference().as_ptr()));
    }

    #[test]
    fn test_concurrent_reads() {
        let buffer = buffer();
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = buffer.clone();
                thread::spawn(move || handle.reference().iter().sum::<f32>())
            })
            .collect();
        let sums: Vec<f32> = workers.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(sums.iter().all(|&s| s == 45.0));
    }
}
