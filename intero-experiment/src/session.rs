use intero_core::{BoundarySkew, TrialRecord};
use rand::Rng;
use rand::seq::SliceRandom;

/// Ordered trials of one session plus the lengths drawn for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    trial_lengths: Vec<u64>,
    trials: Vec<TrialRecord>,
}

impl Session {
    /// Shuffles `pool` once and keeps the first `trials`, so no length repeats.
    pub fn draw<R: Rng>(pool: &[u64], trials: usize, rng: &mut R) -> Self {
        let mut lengths = pool.to_vec();
        lengths.shuffle(rng);
        lengths.truncate(trials);
        Self {
            trial_lengths: lengths,
            trials: Vec::new(),
        }
    }

    pub fn trial_lengths(&self) -> &[u64] {
        &self.trial_lengths
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn total_trials(&self) -> usize {
        self.trial_lengths.len()
    }

    pub fn completed(&self) -> usize {
        self.trials.len()
    }

    /// Length of the trial that has not been appended yet.
    pub fn next_length(&self) -> Option<u64> {
        self.trial_lengths.get(self.trials.len()).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.trials.len() >= self.trial_lengths.len()
    }

    pub(crate) fn append(&mut self, record: TrialRecord) {
        self.trials.push(record);
    }
}

/// Trial under way. Fields fill in as the stages progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingTrial {
    pub trial_id: usize,
    pub trial_length: u64,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub count_measured: Option<u32>,
    pub skew: Option<BoundarySkew>,
    pub count_entered: Option<u32>,
    pub confidence: Option<f64>,
}

impl PendingTrial {
    pub fn new(trial_id: usize, trial_length: u64) -> Self {
        Self {
            trial_id,
            trial_length,
            ..Default::default()
        }
    }

    /// Builds the immutable record once every field has been supplied.
    pub fn finish(&self, accuracy: Option<f64>) -> Option<TrialRecord> {
        Some(TrialRecord {
            trial_id: self.trial_id,
            trial_length: self.trial_length,
            count_measured: self.count_measured?,
            count_entered: self.count_entered?,
            accuracy,
            confidence: self.confidence?,
            start_time: self.start_time?,
            end_time: self.end_time?,
            skew: self.skew,
        })
    }
}
