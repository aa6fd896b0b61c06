use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("trials_per_session must be at least 1")]
    NoTrials,
    #[error("trial_lengths_s is empty")]
    NoTrialLengths,
    #[error("{trials} trials requested but only {lengths} trial lengths to draw from")]
    NotEnoughLengths { trials: usize, lengths: usize },
    #[error("trial lengths must be positive")]
    ZeroLengthTrial,
    #[error("sampling rate must be positive and finite, got {0}")]
    InvalidSamplingRate(f64),
    #[error("history_seconds must be positive")]
    ZeroHistory,
    #[error("history_seconds {history} cannot hold a {longest} s trial plus margin")]
    HistoryTooShort { longest: u64, history: u64 },
    #[error("refresh_ms must be positive")]
    ZeroRefresh,
}

/// Session record could not be persisted; the session is unsaved.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("cannot create session directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write session record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize session record {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no free file name for session record in {0}")]
    NameExhausted(PathBuf),
}
