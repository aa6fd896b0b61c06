pub mod sample;
pub mod stage;
pub mod trial;

pub use sample::{BoundarySkew, Sample};
pub use stage::Stage;
pub use trial::TrialRecord;
