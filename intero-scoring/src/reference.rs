use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ReferenceError, ScoreError};
use crate::percentile::percentile_of_sorted;

pub const AWARENESS_HIGH_FILE: &str = "accuracy_awareness_high.csv";
pub const AWARENESS_LOW_FILE: &str = "accuracy_awareness_low.csv";
pub const CONFIDENCE_HIGH_FILE: &str = "accuracy_confidence_high.csv";
pub const CONFIDENCE_LOW_FILE: &str = "accuracy_confidence_low.csv";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AwarenessRow {
    pub accuracy: f64,
    pub awareness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConfidenceRow {
    pub accuracy: f64,
    pub confidence: f64,
}

trait FiniteRow {
    fn is_finite(&self) -> bool;
}

impl FiniteRow for AwarenessRow {
    fn is_finite(&self) -> bool {
        self.accuracy.is_finite() && self.awareness.is_finite()
    }
}

impl FiniteRow for ConfidenceRow {
    fn is_finite(&self) -> bool {
        self.accuracy.is_finite() && self.confidence.is_finite()
    }
}

/// Prior participants split by accuracy. The split is informational; scoring
/// ranks against the pooled groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceGroups<R> {
    pub high: Vec<R>,
    pub low: Vec<R>,
}

impl<R> ReferenceGroups<R> {
    pub fn len(&self) -> usize {
        self.high.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.low.is_empty()
    }

    pub fn pooled(&self) -> impl Iterator<Item = &R> {
        self.high.iter().chain(&self.low)
    }
}

/// Normative reference population, loaded once and never mutated.
///
/// Pooled columns are kept sorted so each percentile lookup is a binary
/// search.
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    awareness: ReferenceGroups<AwarenessRow>,
    confidence: ReferenceGroups<ConfidenceRow>,
    accuracy_sorted: Vec<f64>,
    awareness_sorted: Vec<f64>,
    confidence_sorted: Vec<f64>,
}

impl ReferenceDataset {
    /// Reads the four reference files from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let dir = dir.as_ref();
        let awareness = ReferenceGroups {
            high: read_rows(&dir.join(AWARENESS_HIGH_FILE))?,
            low: read_rows(&dir.join(AWARENESS_LOW_FILE))?,
        };
        let confidence = ReferenceGroups {
            high: read_rows(&dir.join(CONFIDENCE_HIGH_FILE))?,
            low: read_rows(&dir.join(CONFIDENCE_LOW_FILE))?,
        };
        let dataset = Self::from_groups(awareness, confidence)?;
        info!(
            "Loaded reference data from {}: {} awareness rows, {} confidence rows",
            dir.display(),
            dataset.awareness.len(),
            dataset.confidence.len()
        );
        Ok(dataset)
    }

    pub fn from_groups(
        awareness: ReferenceGroups<AwarenessRow>,
        confidence: ReferenceGroups<ConfidenceRow>,
    ) -> Result<Self, ReferenceError> {
        let check = |empty: bool, name: &str| {
            if empty {
                Err(ReferenceError::Empty {
                    path: PathBuf::from(name),
                })
            } else {
                Ok(())
            }
        };
        check(awareness.is_empty(), "accuracy_awareness_*")?;
        check(confidence.is_empty(), "accuracy_confidence_*")?;
        for (row, r) in awareness.pooled().enumerate() {
            if !r.is_finite() {
                return Err(ReferenceError::NonFinite {
                    path: PathBuf::from("accuracy_awareness_*"),
                    row,
                });
            }
        }
        for (row, r) in confidence.pooled().enumerate() {
            if !r.is_finite() {
                return Err(ReferenceError::NonFinite {
                    path: PathBuf::from("accuracy_confidence_*"),
                    row,
                });
            }
        }

        let accuracy_sorted = sorted(awareness.pooled().map(|r| r.accuracy));
        let awareness_sorted = sorted(awareness.pooled().map(|r| r.awareness));
        let confidence_sorted = sorted(confidence.pooled().map(|r| r.confidence));

        Ok(Self {
            awareness,
            confidence,
            accuracy_sorted,
            awareness_sorted,
            confidence_sorted,
        })
    }

    pub fn awareness_groups(&self) -> &ReferenceGroups<AwarenessRow> {
        &self.awareness
    }

    pub fn confidence_groups(&self) -> &ReferenceGroups<ConfidenceRow> {
        &self.confidence
    }

    pub fn accuracy_percentile(&self, accuracy: f64) -> Result<f64, ScoreError> {
        percentile_of_sorted(&self.accuracy_sorted, accuracy)
    }

    pub fn awareness_percentile(&self, r: f64) -> Result<f64, ScoreError> {
        percentile_of_sorted(&self.awareness_sorted, r)
    }

    pub fn confidence_percentile(&self, confidence: f64) -> Result<f64, ScoreError> {
        percentile_of_sorted(&self.confidence_sorted, confidence)
    }
}

fn sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v
}

fn read_rows<R>(path: &Path) -> Result<Vec<R>, ReferenceError>
where
    R: DeserializeOwned + FiniteRow,
{
    let csv_err = |source| ReferenceError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows = Vec::new();
    for (row, record) in reader.deserialize::<R>().enumerate() {
        let record = record.map_err(csv_err)?;
        if !record.is_finite() {
            return Err(ReferenceError::NonFinite {
                path: path.to_path_buf(),
                row,
            });
        }
        rows.push(record);
    }
    if rows.is_empty() {
        return Err(ReferenceError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(rows)
}
