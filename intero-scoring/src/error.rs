use std::path::PathBuf;

use thiserror::Error;

/// A score that cannot be computed from the given inputs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScoreError {
    #[error("accuracy undefined: measured and entered counts are both zero")]
    ZeroBeatTotal,
    #[error("correlation needs at least 2 samples, got {n}")]
    TooFewSamples { n: usize },
    #[error("correlation undefined: an input has zero variance")]
    ZeroVariance,
    #[error("inputs differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("reference sample is empty")]
    EmptyReference,
    #[error("input contains a non-finite value")]
    NonFiniteInput,
    #[error("no trials recorded")]
    NoTrials,
    #[error("trials {indices:?} have undefined accuracy")]
    DegenerateTrials { indices: Vec<usize> },
}

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read reference file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("reference file {path} has no rows")]
    Empty { path: PathBuf },
    #[error("reference file {path} row {row} contains a non-finite value")]
    NonFinite { path: PathBuf, row: usize },
}
