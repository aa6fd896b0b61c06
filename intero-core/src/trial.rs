use serde::{Deserialize, Serialize};

use crate::sample::BoundarySkew;

/// Finished trial as appended to a session. Never mutated after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_id: usize,
    /// Requested countdown length in seconds.
    pub trial_length: u64,
    pub count_measured: u32,
    pub count_entered: u32,
    /// `None` when both counts are zero and accuracy is undefined.
    pub accuracy: Option<f64>,
    pub confidence: f64,
    /// Host-clock bounds of the counting window.
    pub start_time: f64,
    pub end_time: f64,
    /// `None` when the window held no samples.
    pub skew: Option<BoundarySkew>,
}
