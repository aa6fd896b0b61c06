use crate::error::ScoreError;

/// Complement of the symmetric relative error between the detected and the
/// reported beat count: `1 - |m - e| / ((m + e) / 2)`.
///
/// Ranges over `[-1, 1]`; undefined when both counts are zero.
pub fn trial_accuracy(measured: u32, entered: u32) -> Result<f64, ScoreError> {
    let total = measured as f64 + entered as f64;
    if total == 0.0 {
        return Err(ScoreError::ZeroBeatTotal);
    }
    let diff = (measured as f64 - entered as f64).abs();
    Ok(1.0 - diff / (0.5 * total))
}

pub fn average_accuracy(accuracies: &[f64]) -> Result<f64, ScoreError> {
    if accuracies.is_empty() {
        return Err(ScoreError::NoTrials);
    }
    if accuracies.iter().any(|a| !a.is_finite()) {
        return Err(ScoreError::NonFiniteInput);
    }
    Ok(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
}
