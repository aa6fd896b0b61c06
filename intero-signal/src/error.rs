use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SignalError {
    #[error("buffer capacity must be greater than zero")]
    ZeroCapacity,
    #[error("sampling rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),
    #[error("sensor stream has not been started")]
    NotStarted,
    #[error("sensor stream interrupted: {0}")]
    Interrupted(String),
    #[error("sensor stream ended")]
    StreamEnded,
    #[error("sensor stream fault: {0}")]
    StreamFault(String),
}

impl SignalError {
    /// Interruptions are retried on the next poll; everything else stops ingestion.
    pub fn is_transient(&self) -> bool {
        matches!(self, SignalError::Interrupted(_))
    }
}
