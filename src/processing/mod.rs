//! Audio Alignment Pipeline

pub mod planner;
pub mod buffer;
pub mod features;
pub mod aligner;
pub mod pool;
pub mod aggregator;
pub mod pipeline;

pub use planner::{ChunkPlanner, ChunkTask};
pub use buffer::{ChunkSamples, SharedSampleBuffer};
pub use features::{FeatureExtractor, FeatureMethod, FeatureParams, OnsetStrengthExtractor, RmsExtractor};
pub use aligner::{ChunkAligner, DelayResult};
pub use pool::{ChunkOutcome, ChunkProgress, WorkerPool};
pub use aggregator::{AlignmentSummary, ReportLine, ResultAggregator, ToleranceStatus};
pub use pipeline::{AlignEvent, Aligner, AlignmentReport};
