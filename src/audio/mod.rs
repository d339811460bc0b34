//! Audio Input Module
//!
//! Reads media tracks into mono PCM at the working sample rate.
//! Currently focuses on WAV format support.

pub mod wav;
pub mod converter;
pub mod loader;

pub use wav::{WavAudio, AudioFormat, AudioHeader};
pub use converter::AudioConverter;
pub use loader::{AudioTrackLoader, FrameRate, WavTrackLoader};
