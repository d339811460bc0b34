//! WAV audio file reading and writing

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use hound::{SampleFormat, WavReader, WavWriter};
use ndarray::{Array1, Array2, Axis};
use crate::error::{AlignerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Int16,
    Int24,
    Int32,
    Float32,
}

impl AudioFormat {
    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::Int16 => "int16",
            AudioFormat::Int24 => "int24",
            AudioFormat::Int32 => "int32",
            AudioFormat::Float32 => "float32",
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            AudioFormat::Int16 => 16,
            AudioFormat::Int24 => 24,
            AudioFormat::Int32 | AudioFormat::Float32 => 32,
        }
    }

    fn from_spec(spec: &hound::WavSpec) -> Result<Self> {
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => Ok(AudioFormat::Int16),
            (SampleFormat::Int, 24) => Ok(AudioFormat::Int24),
            (SampleFormat::Int, 32) => Ok(AudioFormat::Int32),
            (SampleFormat::Float, 32) => Ok(AudioFormat::Float32),
            (format, bits) => Err(AlignerError::audio(format!(
                "Unsupported sample format: {:?} at {} bits", format, bits
            ))),
        }
    }

    fn full_scale(&self) -> f32 {
        match self {
            AudioFormat::Int16 => i16::MAX as f32,
            AudioFormat::Int24 => 8_388_607.0,
            AudioFormat::Int32 => i32::MAX as f32,
            AudioFormat::Float32 => 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
    /// Frames per channel
    pub total_frames: usize,
}

impl AudioHeader {
    pub fn duration(&self) -> f64 {
        self.total_frames as f64 / self.sample_rate as f64
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(AlignerError::audio("Sample rate cannot be 0"));
        }
        if self.channels == 0 {
            return Err(AlignerError::audio("Channel count cannot be 0"));
        }
        Ok(())
    }

    fn to_wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.format.bits_per_sample(),
            sample_format: match self.format {
                AudioFormat::Float32 => SampleFormat::Float,
                _ => SampleFormat::Int,
            },
        }
    }
}

/// Decoded WAV file, samples stored as `frames x channels`
#[derive(Debug, Clone)]
pub struct WavAudio {
    pub header: AudioHeader,
    pub data: Array2<f32>,
}

impl WavAudio {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .map_err(|e| AlignerError::audio(format!(
                "Cannot open audio file {}: {}", path.display(), e
            )))?;

        Self::from_reader(reader)
    }

    fn from_reader(mut reader: WavReader<BufReader<File>>) -> Result<Self> {
        let spec = reader.spec();
        let format = AudioFormat::from_spec(&spec)?;
        let channels = spec.channels as usize;

        let samples: Vec<f32> = match format {
            AudioFormat::Float32 => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            _ => {
                let scale = format.full_scale();
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let header = AudioHeader {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            format,
            total_frames: samples.len() / channels.max(1),
        };
        header.validate()?;

        let usable = header.total_frames * channels;
        let data = Array2::from_shape_vec((header.total_frames, channels), samples[..usable].to_vec())
            .map_err(|e| AlignerError::audio(format!("Malformed sample data: {}", e)))?;

        Ok(Self { header, data })
    }

    pub fn new_mono(sample_rate: u32, samples: Array1<f32>, format: AudioFormat) -> Self {
        let total_frames = samples.len();
        Self {
            header: AudioHeader { sample_rate, channels: 1, format, total_frames },
            data: samples.insert_axis(Axis(1)),
        }
    }

    /// Build from one sample vector per channel; all channels must have equal length.
    pub fn from_channels(sample_rate: u32, channels: &[Vec<f32>], format: AudioFormat) -> Result<Self> {
        let frames = channels.first().map(Vec::len).unwrap_or(0);
        if channels.is_empty() || channels.iter().any(|c| c.len() != frames) {
            return Err(AlignerError::audio("Channels must be non-empty and of equal length"));
        }

        let mut data = Array2::zeros((frames, channels.len()));
        for (idx, channel) in channels.iter().enumerate() {
            data.column_mut(idx).assign(&Array1::from(channel.clone()));
        }

        Ok(Self {
            header: AudioHeader {
                sample_rate,
                channels: channels.len() as u16,
                format,
                total_frames: frames,
            },
            data,
        })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let spec = self.header.to_wav_spec();
        let mut writer = WavWriter::create(path, spec)
            .map_err(|e| AlignerError::audio(format!(
                "Cannot create output file {}: {}", path.display(), e
            )))?;

        let scale = self.header.format.full_scale();
        for &sample in self.data.iter() {
            let clamped = sample.clamp(-1.0, 1.0);
            match self.header.format {
                AudioFormat::Float32 => writer.write_sample(clamped)?,
                AudioFormat::Int16 => writer.write_sample((clamped * scale) as i16)?,
                AudioFormat::Int24 | AudioFormat::Int32 => writer.write_sample((clamped * scale) as i32)?,
            }
        }

        writer.finalize()?;
        Ok(())
    }

    /// Copy out a single channel as a contiguous mono signal.
    pub fn channel(&self, index: usize) -> Result<Array1<f32>> {
        if index >= self.channels() as usize {
            return Err(AlignerError::audio(format!(
                "Audio track {} does not exist ({} available)", index, self.channels()
            )));
        }
        Ok(self.data.column(index).to_owned())
    }

    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.header.channels
    }

    pub fn total_frames(&self) -> usize {
        self.header.total_frames
    }

    pub fn duration(&self) -> f64 {
        self.header.duration()
    }

    pub fn format(&self) -> AudioFormat {
        self.header.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_audio_format() {
        assert_eq!(AudioFormat::Int16.name(), "int16");
        assert_eq!(AudioFormat::Int16.bits_per_sample(), 16);
        assert_eq!(AudioFormat::Int24.bits_per_sample(), 24);
        assert_eq!(AudioFormat::Float32.name(), "float32");
        assert_eq!(AudioFormat::Float32.bits_per_sample(), 32);
    }

    #[test]
    fn test_header_validation() {
        let header = AudioHeader { sample_rate: 16000, channels: 1, format: AudioFormat::Float32, total_frames: 1000 };
        assert!(header.validate().is_ok());
        assert!((header.duration() - 0.0625).abs() < f64::EPSILON);

        let invalid = AudioHeader { sample_rate: 0, ..header.clone() };
        assert!(invalid.validate().is_err());

        let invalid = AudioHeader { channels: 0, ..header };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_channel_selection() {
        let audio = WavAudio::from_channels(
            8000,
            &[vec![0.1, 0.2, 0.3], vec![-0.1, -0.2, -0.3]],
            AudioFormat::Float32,
        ).unwrap();

        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.total_frames(), 3);
        assert_eq!(audio.channel(1).unwrap().to_vec(), vec![-0.1, -0.2, -0.3]);
        assert!(audio.channel(2).is_err());
    }

    #[test]
    fn test_mismatched_channels_rejected() {
        let result = WavAudio::from_channels(8000, &[vec![0.1, 0.2], vec![0.1]], AudioFormat::Int16);
        assert!(result.is_err());
    }

    #[test]
    fn test_wav_roundtrip_int16_stereo() {
        let audio = WavAudio::from_channels(
            16000,
            &[vec![0.5, -0.5, 0.25, 0.0], vec![0.1, 0.2, 0.3, 0.4]],
            AudioFormat::Int16,
        ).unwrap();

        let temp_file = NamedTempFile::new().unwrap();
        audio.save_to_file(temp_file.path()).unwrap();

        let loaded = WavAudio::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.sample_rate(), 16000);
        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.format(), AudioFormat::Int16);

        let left = loaded.channel(0).unwrap();
        for (loaded, original) in left.iter().zip([0.5, -0.5, 0.25, 0.0]) {
            assert!((loaded - original).abs() < 1e-3);
        }
    }

    #[test]
    fn test_wav_roundtrip_float() {
        let data = Array1::from(vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        let original = WavAudio::new_mono(16000, data.clone(), AudioFormat::Float32);

        let temp_file = NamedTempFile::new().unwrap();
        original.save_to_file(temp_file.path()).unwrap();

        let loaded = WavAudio::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.total_frames(), original.total_frames());
        for (l, o) in loaded.channel(0).unwrap().iter().zip(data.iter()) {
            assert!((l - o).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(WavAudio::from_file("/nonexistent/track.wav").is_err());
    }
}
