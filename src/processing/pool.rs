//! Worker Pool - runs chunk alignment sequentially or across a rayon pool

use std::sync::mpsc::channel;
use std::time::Instant;
use crate::error::{AlignerError, Result};
use super::aligner::{ChunkAligner, DelayResult};
use super::buffer::SharedSampleBuffer;
use super::features::FeatureExtractor;
use super::planner::ChunkTask;

/// Result of one chunk, success or failure
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub chunk_idx: usize,
    /// Index of the worker that processed the chunk
    pub worker: usize,
    pub result: Result<DelayResult>,
    pub time_ms: u64,
}

/// Completed / total chunk counts, reported after every outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    num_workers: usize,
}

impl WorkerPool {
    pub fn new(num_workers: usize) -> Result<Self> {
        if num_workers == 0 {
            return Err(AlignerError::config("Worker count must be at least 1"));
        }
        Ok(Self { num_workers })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Workers actually used for `chunk_count` chunks
    pub fn effective_workers(&self, chunk_count: usize) -> usize {
        self.num_workers.min(chunk_count).max(1)
    }

    /// Align every task, calling `on_outcome` as each chunk finishes.
    ///
    /// Outcomes arrive in completion order, which is unspecified with more
    /// than one worker. Chunk failures are delivered, never propagated.
    pub fn run<F>(
        &self,
        tasks: &[ChunkTask],
        buffer: &SharedSampleBuffer,
        extractor: &dyn FeatureExtractor,
        aligner: &ChunkAligner,
        mut on_outcome: F,
    ) -> Result<Vec<ChunkOutcome>>
    where
        F: FnMut(&ChunkOutcome, ChunkProgress),
    {
        let total = tasks.len();
        let mut outcomes = Vec::with_capacity(total);
        if total == 0 {
            return Ok(outcomes);
        }

        let workers = self.effective_workers(total);
        log::debug!("Dispatching {} chunks to {} workers", total, workers);

        let mut deliver = |outcome: ChunkOutcome| {
            if let Err(e) = &outcome.result {
                log::error!("Worker {} error in chunk {}: {}", outcome.worker, outcome.chunk_idx, e);
            }
            let progress = ChunkProgress { completed: outcomes.len() + 1, total };
            on_outcome(&outcome, progress);
            outcomes.push(outcome);
        };

        if workers == 1 {
            for task in tasks {
                deliver(process_chunk(0, task, buffer, extractor, aligner));
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("aligner-worker-{}", i))
                .build()
                .map_err(|e| AlignerError::processing(format!("Failed to start worker pool: {}", e)))?;

            let (tx, rx) = channel::<ChunkOutcome>();
            pool.in_place_scope(|scope| {
                for task in tasks {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let worker = rayon::current_thread_index().unwrap_or(0);
                        let _ = tx.send(process_chunk(worker, task, buffer, extractor, aligner));
                    });
                }
                drop(tx);

                for outcome in rx.iter() {
                    deliver(outcome);
                }
            });
        }

        Ok(outcomes)
    }
}

fn process_chunk(
    worker: usize,
    task: &ChunkTask,
    buffer: &SharedSampleBuffer,
    extractor: &dyn FeatureExtractor,
    aligner: &ChunkAligner,
) -> ChunkOutcome {
    let start = Instant::now();
    let result = buffer
        .chunk(task)
        .and_then(|samples| aligner.align_chunk(task, samples, extractor));

    ChunkOutcome {
        chunk_idx: task.chunk_idx,
        worker,
        result,
        time_ms: start.elapsed().as_millis() as u64,
    }
}
