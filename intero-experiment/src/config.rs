use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// History kept beyond the longest trial, covering sensor delivery latency.
pub const HISTORY_MARGIN_S: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub trials_per_session: usize,
    /// Pool drawn from without replacement, in seconds.
    pub trial_lengths_s: Vec<u64>,
    pub settle_delay_ms: u64,
    pub sampling_rate_hz: f64,
    pub history_seconds: u64,
    pub refresh_ms: u64,
    pub ingest_poll_ms: u64,
    /// Boundary skew above this is logged as a warning.
    pub skew_warn_s: f64,
    pub output_dir: PathBuf,
    pub reference_dir: Option<PathBuf>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            trials_per_session: 3,
            trial_lengths_s: vec![25, 35, 45],
            settle_delay_ms: 4000,
            sampling_rate_hz: 130.0,
            history_seconds: 180,
            refresh_ms: 50,
            ingest_poll_ms: 5,
            skew_warn_s: 0.5,
            output_dir: PathBuf::from("session_data"),
            reference_dir: None,
        }
    }
}

impl ExperimentConfig {
    /// Reads a JSON config. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials_per_session == 0 {
            return Err(ConfigError::NoTrials);
        }
        if self.trial_lengths_s.is_empty() {
            return Err(ConfigError::NoTrialLengths);
        }
        if self.trials_per_session > self.trial_lengths_s.len() {
            return Err(ConfigError::NotEnoughLengths {
                trials: self.trials_per_session,
                lengths: self.trial_lengths_s.len(),
            });
        }
        if self.trial_lengths_s.contains(&0) {
            return Err(ConfigError::ZeroLengthTrial);
        }
        if !(self.sampling_rate_hz.is_finite() && self.sampling_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSamplingRate(self.sampling_rate_hz));
        }
        if self.history_seconds == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        let longest = self.longest_trial();
        if longest + HISTORY_MARGIN_S > self.history_seconds {
            return Err(ConfigError::HistoryTooShort {
                longest,
                history: self.history_seconds,
            });
        }
        if self.refresh_ms == 0 {
            return Err(ConfigError::ZeroRefresh);
        }
        Ok(())
    }

    pub fn longest_trial(&self) -> u64 {
        self.trial_lengths_s.iter().copied().max().unwrap_or(0)
    }

    pub fn buffer_capacity(&self) -> usize {
        (self.sampling_rate_hz * self.history_seconds as f64).ceil() as usize
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn ingest_poll(&self) -> Duration {
        Duration::from_millis(self.ingest_poll_ms)
    }
}
