use clap_host::{ActivationError, ProcessError};
use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Symphonia(#[from] SymphoniaError),
    #[error(transparent)]
    Hound(#[from] hound::Error),
    #[error("no supported audio tracks found in source")]
    NoSupportedTracks,
    #[error("decoded audio contains no samples")]
    Empty,
}

/// Failures raised while driving an effect under test.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Activation(#[from] ActivationError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("plug-in exposes no audio output port")]
    NoOutputPort,
    #[error("unknown parameter id {0}")]
    UnknownParameter(u32),
    #[error("invalid sample rate {0}")]
    InvalidSampleRate(u32),
}
