use thiserror::Error;

/// Errors raised by individual signal operations.
///
/// These never escape the heart-rate cascade: a stage that fails is simply
/// treated as having produced an invalid estimate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("invalid waveform: {0}")]
    InvalidWaveform(String),
    #[error("insufficient samples: needed {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },
    #[error("signal contains non-finite samples")]
    NonFinite,
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

pub type SignalResult<T> = Result<T, SignalError>;
