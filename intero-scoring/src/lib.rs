//! Interoceptive accuracy and awareness scoring.
//!
//! Accuracy compares a participant's silent beat count with the detected
//! count. Awareness is the Pearson correlation between per-trial confidence
//! and accuracy. Both are ranked against a reference population.

pub mod accuracy;
pub mod correlation;
pub mod error;
pub mod percentile;
pub mod reference;
pub mod session;

pub use accuracy::{average_accuracy, trial_accuracy};
pub use correlation::{Correlation, pearson};
pub use error::{ReferenceError, ScoreError};
pub use percentile::percentile_of_score;
pub use reference::{AwarenessRow, ConfidenceRow, ReferenceDataset, ReferenceGroups};
pub use session::{SessionScores, score_session};
