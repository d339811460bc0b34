//! Chunk Alignment Module
//!
//! Estimates the delay of one chunk by normalizing both feature sequences
//! and locating the peak of their full linear cross-correlation.
//!
//! Lags count feature steps of the secondary sequence relative to the
//! reference: a positive lag means the secondary's events appear later.

use ndarray::Array1;
use rustfft::{num_complex::Complex, FftPlanner};
use crate::error::{AlignerError, Result};
use super::buffer::ChunkSamples;
use super::features::{FeatureExtractor, FeatureParams};
use super::planner::ChunkTask;

/// Above this many multiply-adds the correlation goes through an FFT
const DIRECT_CORRELATION_LIMIT: usize = 1 << 22;

/// Relative standard deviation below which a sequence counts as flat
const VARIANCE_EPSILON: f64 = 1e-10;

/// Delay estimate for one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DelayResult {
    pub chunk_idx: usize,
    /// Positive when the secondary track lags the reference
    pub delay_ms: i64,
}

#[derive(Debug, Clone)]
pub struct ChunkAligner {
    params: FeatureParams,
    sample_rate: u32,
}

impl ChunkAligner {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_params(FeatureParams::for_sample_rate(sample_rate), sample_rate)
    }

    pub fn with_params(params: FeatureParams, sample_rate: u32) -> Self {
        Self { params, sample_rate }
    }

    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    /// Extract features for both tracks of a chunk and align them.
    ///
    /// Every failure comes back as [`AlignerError::Chunk`] carrying the chunk index.
    pub fn align_chunk(
        &self,
        task: &ChunkTask,
        samples: ChunkSamples<'_>,
        extractor: &dyn FeatureExtractor,
    ) -> Result<DelayResult> {
        let run = || -> Result<DelayResult> {
            let reference = extractor.extract(samples.reference, self.sample_rate, &self.params)?;
            let secondary = extractor.extract(samples.secondary, self.sample_rate, &self.params)?;
            self.align_features(task.chunk_idx, &reference, &secondary)
        };

        run().map_err(|e| match e {
            AlignerError::Chunk { .. } => e,
            other => AlignerError::chunk(task.chunk_idx, other.to_string()),
        })
    }

    /// Align two already extracted feature sequences
    pub fn align_features(&self, chunk_idx: usize, reference: &[f32], secondary: &[f32]) -> Result<DelayResult> {
        let reference = normalize(reference)
            .map_err(|e| AlignerError::chunk(chunk_idx, format!("reference: {}", e)))?
            .into_raw_vec();
        let secondary = normalize(secondary)
            .map_err(|e| AlignerError::chunk(chunk_idx, format!("secondary: {}", e)))?
            .into_raw_vec();

        let correlation = cross_correlate(&reference, &secondary);
        let lag = peak_lag(&correlation, reference.len());
        let delay_ms = lag_to_delay_ms(lag, self.params.hop_length, self.sample_rate);

        log::debug!("Chunk {}: peak lag {} -> {}ms", chunk_idx, lag, delay_ms);
        Ok(DelayResult { chunk_idx, delay_ms })
    }
}

/// Scale to zero mean and unit (population) standard deviation
pub fn normalize(features: &[f32]) -> Result<Array1<f64>> {
    let values: Array1<f64> = features.iter().map(|&v| v as f64).collect();
    let mean = values
        .mean()
        .ok_or_else(|| AlignerError::processing("Empty feature sequence"))?;
    let std = values.std(0.0);

    if !std.is_finite() || std <= VARIANCE_EPSILON * mean.abs().max(1.0) {
        return Err(AlignerError::processing("Feature sequence has zero variance"));
    }

    Ok(values.mapv(|v| (v - mean) / std))
}

/// Full linear cross-correlation.
///
/// Entry `i` holds `sum_n reference[n] * secondary[n + lag]` for
/// `lag = i - (reference.len() - 1)`, covering every lag from
/// `-(reference.len() - 1)` to `secondary.len() - 1`. This is the
/// `[-(len(secondary) - 1), len(reference) - 1]` window mirrored so that a
/// positive lag means the secondary is later; with equal lengths the two
/// ranges coincide.
pub fn cross_correlate(reference: &[f64], secondary: &[f64]) -> Vec<f64> {
    if reference.is_empty() || secondary.is_empty() {
        return Vec::new();
    }
    if reference.len().saturating_mul(secondary.len()) <= DIRECT_CORRELATION_LIMIT {
        cross_correlate_direct(reference, secondary)
    } else {
        cross_correlate_fft(reference, secondary)
    }
}

fn cross_correlate_direct(reference: &[f64], secondary: &[f64]) -> Vec<f64> {
    let r = reference.len() as isize;
    let s = secondary.len() as isize;

    (-(r - 1)..s)
        .map(|lag| {
            let n_start = (-lag).max(0);
            let n_end = r.min(s - lag);
            (n_start..n_end)
                .map(|n| reference[n as usize] * secondary[(n + lag) as usize])
                .sum()
        })
        .collect()
}

fn cross_correlate_fft(reference: &[f64], secondary: &[f64]) -> Vec<f64> {
    let r = reference.len();
    let s = secondary.len();
    let size = (r + s - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let padded = |data: &[f64]| -> Vec<Complex<f64>> {
        data.iter()
            .map(|&x| Complex::new(x, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(size)
            .collect()
    };

    let mut ref_spectrum = padded(reference);
    let mut spectrum = padded(secondary);
    forward.process(&mut ref_spectrum);
    forward.process(&mut spectrum);

    for (y, x) in spectrum.iter_mut().zip(&ref_spectrum) {
        *y *= x.conj();
    }
    inverse.process(&mut spectrum);

    // Circular index m holds lag m for m < s, lag m - size otherwise
    let norm = 1.0 / size as f64;
    (-(r as isize - 1)..s as isize)
        .map(|lag| {
            let m = (if lag < 0 { size as isize + lag } else { lag }) as usize;
            spectrum[m].re * norm
        })
        .collect()
}

/// Lag of the correlation peak; ties resolve to the smallest lag.
///
/// Ties are only exact on the direct path; FFT rounding noise can split them.
pub fn peak_lag(correlation: &[f64], reference_len: usize) -> i64 {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (idx, &value) in correlation.iter().enumerate() {
        if value > best {
            best = value;
            best_idx = idx;
        }
    }
    best_idx as i64 - (reference_len as i64 - 1)
}

/// `lag * hop / sample_rate` seconds, in whole milliseconds truncated toward zero
pub fn lag_to_delay_ms(lag: i64, hop_length: usize, sample_rate: u32) -> i64 {
    lag * hop_length as i64 * 1000 / sample_rate as i64
}
