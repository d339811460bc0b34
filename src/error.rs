//! Error Types

use thiserror::Error;

/// Main error type
#[derive(Debug, Clone, Error)]
pub enum AlignerError {
    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },

    /// A single chunk failed; never fatal to the run
    #[error("Chunk {chunk_idx} failed: {message}")]
    Chunk { chunk_idx: usize, message: String },

    #[error("No processable audio chunks found. Check durations.")]
    EmptyPlan,

    #[error("No valid delays calculated from any chunk.")]
    NoValidResults,
}

impl AlignerError {
    pub fn audio<S: Into<String>>(msg: S) -> Self { Self::Audio { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { Self::Io { message: msg.into() } }
    pub fn processing<S: Into<String>>(msg: S) -> Self { Self::Processing { message: msg.into() } }

    pub fn chunk<S: Into<String>>(chunk_idx: usize, msg: S) -> Self {
        Self::Chunk { chunk_idx, message: msg.into() }
    }

    /// Only configuration, empty-plan and no-valid-results errors abort a run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Chunk { .. })
    }
}

pub type Result<T> = std::result::Result<T, AlignerError>;

impl From<std::io::Error> for AlignerError {
    fn from(err: std::io::Error) -> Self { Self::io(err.to_string()) }
}

impl From<hound::Error> for AlignerError {
    fn from(err: hound::Error) -> Self { Self::audio(format!("WAV: {}", err)) }
}
