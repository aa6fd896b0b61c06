use intero_core::TrialRecord;
use log::warn;

use crate::accuracy::average_accuracy;
use crate::correlation::{Correlation, pearson};
use crate::error::ScoreError;
use crate::reference::ReferenceDataset;

/// Session-level scores. Each aggregate carries its own failure so that one
/// degenerate score never hides the others.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionScores {
    pub average_accuracy: Result<f64, ScoreError>,
    pub accuracy_percentile: Option<Result<f64, ScoreError>>,
    pub awareness: Result<Correlation, ScoreError>,
    pub awareness_percentile: Option<Result<f64, ScoreError>>,
    pub mean_confidence: Result<f64, ScoreError>,
    pub confidence_percentile: Option<Result<f64, ScoreError>>,
}

impl SessionScores {
    pub fn errors(&self) -> Vec<&ScoreError> {
        let mut errors = Vec::new();
        errors.extend(self.average_accuracy.as_ref().err());
        errors.extend(self.awareness.as_ref().err());
        errors.extend(self.mean_confidence.as_ref().err());
        for p in [
            &self.accuracy_percentile,
            &self.awareness_percentile,
            &self.confidence_percentile,
        ]
        .into_iter()
        .flatten()
        {
            errors.extend(p.as_ref().err());
        }
        errors
    }
}

/// Scores a finished session, ranking against `reference` when present.
///
/// Trials with undefined accuracy make the accuracy aggregates fail with
/// their indices rather than being filtered out.
pub fn score_session(trials: &[TrialRecord], reference: Option<&ReferenceDataset>) -> SessionScores {
    let degenerate: Vec<usize> = trials
        .iter()
        .enumerate()
        .filter(|(_, t)| t.accuracy.is_none())
        .map(|(i, _)| i)
        .collect();

    let accuracies: Result<Vec<f64>, ScoreError> = if trials.is_empty() {
        Err(ScoreError::NoTrials)
    } else if !degenerate.is_empty() {
        warn!("Trials {degenerate:?} have undefined accuracy");
        Err(ScoreError::DegenerateTrials {
            indices: degenerate,
        })
    } else {
        Ok(trials.iter().filter_map(|t| t.accuracy).collect())
    };
    let confidences: Vec<f64> = trials.iter().map(|t| t.confidence).collect();

    let average = accuracies.clone().and_then(|a| average_accuracy(&a));
    let awareness = accuracies.and_then(|a| pearson(&confidences, &a));
    let mean_confidence = average_accuracy(&confidences);

    let accuracy_percentile = reference.map(|r| {
        average
            .clone()
            .and_then(|v| r.accuracy_percentile(v))
    });
    let awareness_percentile = reference.map(|r| {
        awareness
            .clone()
            .and_then(|c| r.awareness_percentile(c.r))
    });
    let confidence_percentile = reference.map(|r| {
        mean_confidence
            .clone()
            .and_then(|v| r.confidence_percentile(v))
    });

    SessionScores {
        average_accuracy: average,
        accuracy_percentile,
        awareness,
        awareness_percentile,
        mean_confidence,
        confidence_percentile,
    }
}
