//! Track loading: pulls one mono PCM track out of a media file at the
//! working sample rate.

use std::fmt;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::audio::{AudioConverter, WavAudio};
use crate::error::{AlignerError, Result};

/// Video frame rate as an exact ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    /// 23.976 fps, used when the source does not declare a rate
    pub const DEFAULT: FrameRate = FrameRate { numerator: 24000, denominator: 1001 };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(AlignerError::config(format!(
                "Invalid frame rate {}/{}", numerator, denominator
            )));
        }
        Ok(Self { numerator, denominator })
    }

    /// Approximate a decimal rate such as `25` or `29.97` with a millisecond-exact ratio.
    pub fn from_f64(fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(AlignerError::config(format!("Frame rate must be positive, got {}", fps)));
        }
        if (fps - 23.976).abs() < 1e-3 {
            return Ok(Self::DEFAULT);
        }
        if (fps - 29.97).abs() < 1e-3 {
            return Self::new(30000, 1001);
        }
        if (fps - 59.94).abs() < 1e-3 {
            return Self::new(60000, 1001);
        }
        Self::new((fps * 1000.0).round() as u32, 1000)
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of one frame in milliseconds
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 * self.denominator as f64 / self.numerator as f64
    }

    /// Playback speed factor needed to conform `self` to `target`
    pub fn speed_factor(&self, target: FrameRate) -> f64 {
        target.as_f64() / self.as_f64()
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} fps", self.as_f64())
    }
}

/// Source of mono PCM tracks and their frame rates
pub trait AudioTrackLoader: Send + Sync {
    /// Frame rate of the first video stream, [`FrameRate::DEFAULT`] if unknown.
    fn detect_frame_rate(&self, source: &Path) -> FrameRate;

    /// Decode `track_index` from `source` as mono samples at `sample_rate`.
    ///
    /// `max_duration` of `None` reads the whole track.
    fn load_track(
        &self,
        source: &Path,
        track_index: usize,
        sample_rate: u32,
        max_duration: Option<f64>,
        target_fps: FrameRate,
    ) -> Result<Vec<f32>>;
}

/// Loader for WAV files, where each channel is treated as a separate track.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavTrackLoader;

impl WavTrackLoader {
    pub fn new() -> Self {
        Self
    }
}

impl AudioTrackLoader for WavTrackLoader {
    fn detect_frame_rate(&self, _source: &Path) -> FrameRate {
        // WAV carries no video stream
        FrameRate::DEFAULT
    }

    fn load_track(
        &self,
        source: &Path,
        track_index: usize,
        sample_rate: u32,
        max_duration: Option<f64>,
        target_fps: FrameRate,
    ) -> Result<Vec<f32>> {
        let audio = WavAudio::from_file(source)?;
        log::info!(
            "Loading audio track {} from {} ({} Hz, {} channels, {:.1}s)",
            track_index,
            source.display(),
            audio.sample_rate(),
            audio.channels(),
            audio.duration()
        );

        let speed_factor = self.detect_frame_rate(source).speed_factor(target_fps);
        if (speed_factor - 1.0).abs() > f64::EPSILON {
            log::warn!("FPS mismatch detected! Speed factor: {:.2}", speed_factor);
        }

        let channel = audio.channel(track_index)?;
        let resampled = AudioConverter::convert_sample_rate(channel.view(), audio.sample_rate(), sample_rate)?;
        let samples = AudioConverter::truncate_duration(resampled, sample_rate, max_duration.unwrap_or(0.0));

        log::debug!("Track {} yields {} samples at {} Hz", track_index, samples.len(), sample_rate);
        Ok(samples.to_vec())
    }
}
