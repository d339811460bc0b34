//! Alignment pipeline: load both tracks, plan chunks, align them in
//! parallel and aggregate the delays.

use std::time::Instant;
use crate::audio::{AudioTrackLoader, FrameRate};
use crate::config::{Config, TrackConfig};
use crate::error::{AlignerError, Result};
use super::aggregator::{AlignmentSummary, ResultAggregator};
use super::aligner::ChunkAligner;
use super::buffer::SharedSampleBuffer;
use super::planner::ChunkPlanner;
use super::pool::{ChunkOutcome, ChunkProgress, WorkerPool};

/// Progress notifications emitted during [`Aligner::run`]
#[derive(Debug)]
pub enum AlignEvent<'a> {
    /// Chunks are planned and about to be dispatched
    Started { chunks: usize, workers: usize },
    ChunkDone { outcome: &'a ChunkOutcome, progress: ChunkProgress },
}

#[derive(Debug, Clone)]
pub struct AlignmentReport {
    pub summary: AlignmentSummary,
    /// Chunks that produced no delay, ascending
    pub failed_chunks: Vec<usize>,
    pub chunk_count: usize,
    pub worker_count: usize,
    pub target_fps: FrameRate,
    pub processing_time_secs: f64,
}

pub struct Aligner<L: AudioTrackLoader> {
    config: Config,
    loader: L,
}

impl<L: AudioTrackLoader> Aligner<L> {
    pub fn new(config: Config, loader: L) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, loader })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Frame rate that sets the tolerance window
    pub fn target_fps(&self) -> Result<FrameRate> {
        Ok(match self.config.fps_override()? {
            Some(fps) => fps,
            None => self.loader.detect_frame_rate(&self.config.reference.path),
        })
    }

    /// Load both tracks into a shared buffer
    pub fn load_buffer(&self, target_fps: FrameRate) -> Result<SharedSampleBuffer> {
        let sample_rate = self.config.sample_rate();
        let load = |track: &TrackConfig| {
            self.loader.load_track(
                &track.path,
                track.audio_track,
                sample_rate,
                self.config.max_duration(),
                target_fps,
            )
        };

        let reference = load(&self.config.reference)?;
        let secondary = load(&self.config.secondary)?;
        Ok(SharedSampleBuffer::new(reference, secondary, sample_rate))
    }

    /// Run the full alignment
    pub fn run<F>(&self, on_event: F) -> Result<AlignmentReport>
    where
        F: FnMut(AlignEvent<'_>),
    {
        let target_fps = self.target_fps()?;
        log::info!("Target frame rate: {}", target_fps);

        let buffer = self.load_buffer(target_fps)?;
        self.align_buffer(&buffer, target_fps, on_event)
    }

    /// Align samples that are already loaded
    pub fn align_buffer<F>(
        &self,
        buffer: &SharedSampleBuffer,
        target_fps: FrameRate,
        mut on_event: F,
    ) -> Result<AlignmentReport>
    where
        F: FnMut(AlignEvent<'_>),
    {
        let start = Instant::now();

        let planner = ChunkPlanner::new(self.config.chunk_duration(), buffer.sample_rate())?;
        let tasks = planner.plan(buffer.reference_len(), buffer.secondary_len());
        if tasks.is_empty() {
            return Err(AlignerError::EmptyPlan);
        }

        let pool = WorkerPool::new(self.config.num_workers())?;
        let workers = pool.effective_workers(tasks.len());
        log::info!(
            "Processing {} chunks of {} samples with {} workers ({})",
            tasks.len(),
            planner.samples_per_chunk(),
            workers,
            self.config.method()
        );
        on_event(AlignEvent::Started { chunks: tasks.len(), workers });

        let extractor = self.config.method().extractor();
        let aligner = ChunkAligner::new(buffer.sample_rate());
        let mut aggregator = ResultAggregator::new();

        pool.run(&tasks, buffer, extractor.as_ref(), &aligner, |outcome, progress| {
            aggregator.push(outcome);
            on_event(AlignEvent::ChunkDone { outcome, progress });
        })?;

        let failed_chunks = aggregator.failed_chunks();
        if !failed_chunks.is_empty() {
            log::warn!("{} of {} chunks failed: {:?}", failed_chunks.len(), tasks.len(), failed_chunks);
        }

        let summary = aggregator.finish(target_fps.frame_duration_ms())?;

        Ok(AlignmentReport {
            summary,
            failed_chunks,
            chunk_count: tasks.len(),
            worker_count: workers,
            target_fps,
            processing_time_secs: start.elapsed().as_secs_f64(),
        })
    }
}
