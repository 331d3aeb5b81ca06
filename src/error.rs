use thiserror::Error;

/// Failure to bring up one of the collaborators. Reported once, never retried.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("No audio input device available")]
    NoInputDevice,
    #[error("No input device matches '{0}'")]
    DeviceNotFound(String),
    #[error("Audio backend error: {0}")]
    Backend(String),
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to open audio file: {0}")]
    File(#[from] hound::Error),
    #[error("Failed to spawn audio producer thread: {0}")]
    Spawn(std::io::Error),
    #[error("Terminal unavailable: {0}")]
    Terminal(#[from] std::io::Error),
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

/// Errors raised while constructing the spectral analyzer.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("FFT size {0} must be a power of two between 16 and 16384")]
    InvalidSize(usize),
    #[error("Failed to allocate analysis buffers: {0}")]
    Allocation(#[from] std::collections::TryReserveError),
}

/// Asynchronous stream events observed by the frame scheduler once per tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("Audio stream error: {0}")]
    Backend(String),
    #[error("Audio device disconnected")]
    Disconnected,
    #[error("End of audio stream")]
    Ended,
}
