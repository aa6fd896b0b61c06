use chrono::{DateTime, Local};
use intero_core::TrialRecord;
use intero_scoring::{ScoreError, SessionScores};
use serde::{Deserialize, Serialize};

/// Persisted record of one finished session.
///
/// Scores that could not be computed are `null`; the reason is listed in
/// `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub timestamp: DateTime<Local>,
    pub trial_lengths: Vec<u64>,
    pub average_accuracy: Option<f64>,
    pub accuracy_percentile: Option<f64>,
    pub awareness_score: Option<f64>,
    pub awareness_p_value: Option<f64>,
    pub awareness_percentile: Option<f64>,
    pub mean_confidence: Option<f64>,
    pub confidence_percentile: Option<f64>,
    pub trials: Vec<TrialRecord>,
    pub errors: Vec<String>,
}

impl SessionSummary {
    pub fn new(
        timestamp: DateTime<Local>,
        trial_lengths: Vec<u64>,
        trials: Vec<TrialRecord>,
        scores: &SessionScores,
    ) -> Self {
        let percentile = |p: &Option<Result<f64, ScoreError>>| p.clone().and_then(Result::ok);
        let awareness = scores.awareness.as_ref().ok();
        Self {
            timestamp,
            trial_lengths,
            average_accuracy: scores.average_accuracy.clone().ok(),
            accuracy_percentile: percentile(&scores.accuracy_percentile),
            awareness_score: awareness.map(|c| c.r),
            awareness_p_value: awareness.map(|c| c.p_value),
            awareness_percentile: percentile(&scores.awareness_percentile),
            mean_confidence: scores.mean_confidence.clone().ok(),
            confidence_percentile: percentile(&scores.confidence_percentile),
            trials,
            errors: scores.errors().iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Participant-facing results text.
    pub fn describe(&self) -> String {
        let fmt = |v: Option<f64>, digits: usize| match v {
            Some(v) => format!("{v:.digits$}"),
            None => "n/a".to_string(),
        };
        let mut lines = vec![
            format!(
                "Average accuracy: {} (percentile {})",
                fmt(self.average_accuracy, 3),
                fmt(self.accuracy_percentile, 0)
            ),
            format!(
                "Awareness: r = {}, p = {} (percentile {})",
                fmt(self.awareness_score, 3),
                fmt(self.awareness_p_value, 3),
                fmt(self.awareness_percentile, 0)
            ),
            format!(
                "Mean confidence: {} (percentile {})",
                fmt(self.mean_confidence, 2),
                fmt(self.confidence_percentile, 0)
            ),
        ];
        lines.extend(self.errors.iter().map(|e| format!("Note: {e}")));
        lines.join("\n")
    }
}
