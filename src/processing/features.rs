//! Feature Extraction Module
//!
//! Turns a PCM chunk into one scalar per hop. Two interchangeable
//! extractors are provided: an RMS amplitude envelope and a spectral-flux
//! onset strength envelope.

use std::fmt;
use clap::ValueEnum;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use crate::error::{AlignerError, Result};

/// Hop and frame sizes shared by both extractors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureParams {
    /// Samples between consecutive feature values
    pub hop_length: usize,
    /// Samples analysed per feature value
    pub frame_length: usize,
}

impl FeatureParams {
    /// Roughly one feature value per millisecond
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        let hop_length = sample_rate as usize / 1000 + 1;
        Self {
            hop_length,
            frame_length: hop_length * 12,
        }
    }

    /// Number of centred frames covering `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }
}

/// Produces a per-hop feature sequence from PCM samples
pub trait FeatureExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, chunk: &[f32], sample_rate: u32, params: &FeatureParams) -> Result<Vec<f32>>;
}

/// Available feature extraction methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeatureMethod {
    /// RMS amplitude envelope
    Rms,
    /// Onset strength envelope
    #[default]
    Onset,
}

impl FeatureMethod {
    pub fn extractor(&self) -> Box<dyn FeatureExtractor> {
        match self {
            FeatureMethod::Rms => Box::new(RmsExtractor),
            FeatureMethod::Onset => Box::new(OnsetStrengthExtractor::default()),
        }
    }
}

impl fmt::Display for FeatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureMethod::Rms => write!(f, "rms"),
            FeatureMethod::Onset => write!(f, "onset"),
        }
    }
}

/// Root-mean-square energy over centred, zero-padded frames
#[derive(Debug, Clone, Copy, Default)]
pub struct RmsExtractor;

impl FeatureExtractor for RmsExtractor {
    fn name(&self) -> &'static str {
        "rms"
    }

    fn extract(&self, chunk: &[f32], _sample_rate: u32, params: &FeatureParams) -> Result<Vec<f32>> {
        if chunk.is_empty() {
            return Err(AlignerError::processing("Cannot extract RMS from an empty chunk"));
        }
        if params.hop_length == 0 || params.frame_length == 0 {
            return Err(AlignerError::processing("Hop and frame length must be positive"));
        }

        // Prefix sums of squares, so each frame costs O(1)
        let mut energy = Vec::with_capacity(chunk.len() + 1);
        energy.push(0.0f64);
        let mut acc = 0.0f64;
        for &s in chunk {
            acc += (s as f64) * (s as f64);
            energy.push(acc);
        }

        let half = (params.frame_length / 2) as isize;
        let len = chunk.len() as isize;
        let features = (0..params.frame_count(chunk.len()))
            .map(|t| {
                let start = (t * params.hop_length) as isize - half;
                let end = start + params.frame_length as isize;
                let lo = start.clamp(0, len) as usize;
                let hi = end.clamp(0, len) as usize;
                ((energy[hi] - energy[lo]) / params.frame_length as f64).sqrt() as f32
            })
            .collect();

        Ok(features)
    }
}

/// Spectral-flux onset strength over a Hann-windowed STFT
#[derive(Debug, Clone, Copy)]
pub struct OnsetStrengthExtractor {
    pub n_fft: usize,
}

impl Default for OnsetStrengthExtractor {
    fn default() -> Self {
        Self { n_fft: 2048 }
    }
}

const POWER_FLOOR: f32 = 1e-10;

impl FeatureExtractor for OnsetStrengthExtractor {
    fn name(&self) -> &'static str {
        "onset"
    }

    fn extract(&self, chunk: &[f32], _sample_rate: u32, params: &FeatureParams) -> Result<Vec<f32>> {
        if chunk.is_empty() {
            return Err(AlignerError::processing("Cannot extract onsets from an empty chunk"));
        }
        if params.hop_length == 0 || self.n_fft < 2 {
            return Err(AlignerError::processing("Invalid STFT parameters"));
        }

        let n_fft = self.n_fft;
        let bins = n_fft / 2 + 1;
        let window: Vec<f32> = (0..n_fft)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n_fft as f32).cos())
            .collect();

        let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
        let mut frame = vec![Complex::new(0.0f32, 0.0); n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];
        let mut previous = vec![0.0f32; bins];
        let mut current = vec![0.0f32; bins];

        let half = (n_fft / 2) as isize;
        let frames = params.frame_count(chunk.len());
        let mut features = Vec::with_capacity(frames);

        for t in 0..frames {
            let offset = (t * params.hop_length) as isize - half;
            for (i, bin) in frame.iter_mut().enumerate() {
                let idx = offset + i as isize;
                let sample = if idx >= 0 && (idx as usize) < chunk.len() {
                    chunk[idx as usize] * window[i]
                } else {
                    0.0
                };
                *bin = Complex::new(sample, 0.0);
            }
            fft.process_with_scratch(&mut frame, &mut scratch);

            for (db, c) in current.iter_mut().zip(&frame[..bins]) {
                *db = 10.0 * c.norm_sqr().max(POWER_FLOOR).log10();
            }

            let flux = if t == 0 {
                0.0
            } else {
                current
                    .iter()
                    .zip(&previous)
                    .map(|(c, p)| (c - p).max(0.0))
                    .sum::<f32>()
                    / bins as f32
            };
            features.push(flux);
            std::mem::swap(&mut previous, &mut current);
        }

        Ok(features)
    }
}
