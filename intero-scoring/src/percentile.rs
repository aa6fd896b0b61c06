use crate::error::ScoreError;

/// Weak percentile rank: the percentage of `reference` values that are less
/// than or equal to `value`.
pub fn percentile_of_score(reference: &[f64], value: f64) -> Result<f64, ScoreError> {
    if reference.is_empty() {
        return Err(ScoreError::EmptyReference);
    }
    if value.is_nan() {
        return Err(ScoreError::NonFiniteInput);
    }
    let at_or_below = reference.iter().filter(|&&x| x <= value).count();
    Ok(100.0 * at_or_below as f64 / reference.len() as f64)
}

/// Same rank over an ascending sample, by binary search.
pub(crate) fn percentile_of_sorted(sorted: &[f64], value: f64) -> Result<f64, ScoreError> {
    if sorted.is_empty() {
        return Err(ScoreError::EmptyReference);
    }
    if value.is_nan() {
        return Err(ScoreError::NonFiniteInput);
    }
    let at_or_below = sorted.partition_point(|&x| x <= value);
    Ok(100.0 * at_or_below as f64 / sorted.len() as f64)
}
