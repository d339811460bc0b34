//! Configuration management for audio alignment

use crate::audio::FrameRate;
use crate::error::{AlignerError, Result};
use crate::processing::FeatureMethod;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub verbose: bool,
    pub reference: TrackConfig,
    pub secondary: TrackConfig,
    pub audio: AudioConfig,
    pub alignment: AlignmentConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub path: PathBuf,
    /// 0-based audio track within the media file
    pub audio_track: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Seconds read from the start of each track, 0 for everything
    pub max_duration: f64,
    /// Seconds per independently aligned chunk
    pub chunk_duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub method: FeatureMethod,
    pub num_workers: usize,
    /// Overrides the detected reference frame rate
    pub fps: Option<f64>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            max_duration: 0.0,
            chunk_duration: 300.0,
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            method: FeatureMethod::Onset,
            num_workers: 1,
            fps: None,
        }
    }
}

impl Config {
    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    pub fn chunk_duration(&self) -> f64 {
        self.audio.chunk_duration
    }

    /// Duration cap, `None` when unbounded
    pub fn max_duration(&self) -> Option<f64> {
        (self.audio.max_duration > 0.0).then_some(self.audio.max_duration)
    }

    pub fn method(&self) -> FeatureMethod {
        self.alignment.method
    }

    pub fn num_workers(&self) -> usize {
        self.alignment.num_workers
    }

    pub fn fps_override(&self) -> Result<Option<FrameRate>> {
        self.alignment.fps.map(FrameRate::from_f64).transpose()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "audio-aligner", about = "Estimate the audio delay between two videos", version)]
pub struct Args {
    #[arg(help = "Reference media file")]
    pub reference: PathBuf,

    #[arg(help = "Secondary media file, measured against the reference")]
    pub secondary: PathBuf,

    #[arg(short = 'r', long = "ref-audio-track", help = "Audio track number (0-indexed) from the reference [default: 0]")]
    pub ref_audio_track: Option<usize>,

    #[arg(short = 's', long = "sec-audio-track", help = "Audio track number (0-indexed) from the secondary [default: 0]")]
    pub sec_audio_track: Option<usize>,

    #[arg(short = 'm', long = "method", value_enum, help = "Feature extraction algorithm [default: onset]")]
    pub method: Option<FeatureMethod>,

    #[arg(short = 'd', long = "max-duration", allow_negative_numbers = true, help = "Seconds processed from the start of each track, 0 for full length [default: 0]")]
    pub max_duration: Option<f64>,

    #[arg(short = 'c', long = "chunk-duration", allow_negative_numbers = true, help = "Seconds per chunk [default: 300]")]
    pub chunk_duration: Option<f64>,

    #[arg(long = "sample-rate", help = "Working sample rate in Hz [default: 48000]")]
    pub sample_rate: Option<u32>,

    #[arg(short = 'n', long = "num-workers", help = "Number of parallel workers [default: 1]")]
    pub num_workers: Option<usize>,

    #[arg(long = "fps", help = "Reference frame rate, overrides detection")]
    pub fps: Option<f64>,

    #[arg(long = "config", help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output mode")]
    pub verbose: bool,
}

impl Config {
    /// Create config from command line arguments and config file
    pub fn from_args_and_config(args: Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        config.reference.path = args.reference;
        config.secondary.path = args.secondary;
        if let Some(track) = args.ref_audio_track {
            config.reference.audio_track = track;
        }
        if let Some(track) = args.sec_audio_track {
            config.secondary.audio_track = track;
        }
        if let Some(method) = args.method {
            config.alignment.method = method;
        }
        if let Some(max_duration) = args.max_duration {
            config.audio.max_duration = max_duration;
        }
        if let Some(chunk_duration) = args.chunk_duration {
            config.audio.chunk_duration = chunk_duration;
        }
        if let Some(sample_rate) = args.sample_rate {
            config.audio.sample_rate = sample_rate;
        }
        if let Some(num_workers) = args.num_workers {
            config.alignment.num_workers = num_workers;
        }
        if args.fps.is_some() {
            config.alignment.fps = args.fps;
        }
        config.verbose |= args.verbose;

        config.validate()?;
        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AlignerError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| AlignerError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(AlignerError::config("Sample rate must be greater than 0"));
        }
        if self.audio.sample_rate > 192000 {
            return Err(AlignerError::config("Sample rate cannot exceed 192000 Hz"));
        }

        if !self.audio.chunk_duration.is_finite() || self.audio.chunk_duration <= 0.0 {
            return Err(AlignerError::config("Chunk duration must be greater than 0"));
        }

        if !self.audio.max_duration.is_finite() || self.audio.max_duration < 0.0 {
            return Err(AlignerError::config("Max duration must be non-negative"));
        }

        if self.alignment.num_workers == 0 {
            return Err(AlignerError::config("Worker count must be at least 1"));
        }
        if self.alignment.num_workers > utils::cpu_count() * 2 {
            log::warn!(
                "{} workers requested on {} logical CPUs",
                self.alignment.num_workers,
                utils::cpu_count()
            );
        }

        self.fps_override()?;

        Ok(())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AlignerError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| AlignerError::config(format!("Failed to write config file: {}", e)))
    }
}

pub mod utils {
    pub fn cpu_count() -> usize {
        num_cpus::get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["audio-aligner", "ref.wav", "sec.wav"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sample_rate(), 48000);
        assert_eq!(config.chunk_duration(), 300.0);
        assert_eq!(config.max_duration(), None);
        assert_eq!(config.method(), FeatureMethod::Onset);
        assert_eq!(config.num_workers(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.audio.chunk_duration = 0.0;
        assert!(config.validate().is_err());
        config.audio.chunk_duration = -1.0;
        assert!(config.validate().is_err());
        config.audio.chunk_duration = 300.0;

        config.audio.max_duration = -5.0;
        assert!(config.validate().is_err());
        config.audio.max_duration = 0.0;

        config.alignment.num_workers = 0;
        assert!(config.validate().is_err());
        config.alignment.num_workers = 1;

        config.audio.sample_rate = 0;
        assert!(config.validate().is_err());
        config.audio.sample_rate = 48000;

        config.alignment.fps = Some(0.0);
        assert!(config.validate().is_err());
        config.alignment.fps = Some(25.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_args_override_defaults() {
        let config = Config::from_args_and_config(args(&[
            "-m", "rms", "-c", "60", "-n", "4", "-d", "600", "-s", "2", "--sample-rate", "16000",
        ]))
        .unwrap();

        assert_eq!(config.reference.path, PathBuf::from("ref.wav"));
        assert_eq!(config.secondary.audio_track, 2);
        assert_eq!(config.reference.audio_track, 0);
        assert_eq!(config.method(), FeatureMethod::Rms);
        assert_eq!(config.chunk_duration(), 60.0);
        assert_eq!(config.num_workers(), 4);
        assert_eq!(config.max_duration(), Some(600.0));
        assert_eq!(config.sample_rate(), 16000);
    }

    #[test]
    fn test_invalid_args_rejected() {
        assert!(Config::from_args_and_config(args(&["-c", "-2"])).is_err());
        assert!(Config::from_args_and_config(args(&["-n", "0"])).is_err());
        assert!(Config::from_args_and_config(args(&["-d", "-1"])).is_err());
    }

    #[test]
    fn test_config_file_layering() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("aligner.toml");
        std::fs::write(
            &config_path,
            "[audio]\nchunk_duration = 120.0\nsample_rate = 22050\n\n[alignment]\nmethod = \"rms\"\nnum_workers = 3\n",
        )
        .unwrap();

        let path = config_path.to_str().unwrap();
        let config = Config::from_args_and_config(args(&["--config", path, "-n", "2"])).unwrap();

        assert_eq!(config.chunk_duration(), 120.0);
        assert_eq!(config.sample_rate(), 22050);
        assert_eq!(config.method(), FeatureMethod::Rms);
        assert_eq!(config.num_workers(), 2);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.alignment.fps = Some(25.0);
        config.save_to_file(&config_path).unwrap();

        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded.sample_rate(), config.sample_rate());
        assert_eq!(loaded.chunk_duration(), config.chunk_duration());
        assert_eq!(loaded.alignment.fps, Some(25.0));
        assert!(Config::from_file(temp_dir.path().join("missing.toml")).is_err());
    }
}
