pub mod config;
pub mod display;
pub mod error;
pub mod recorder;
pub mod runner;
pub mod session;
pub mod state;
pub mod summary;

pub use config::ExperimentConfig;
pub use display::{DisplayHandle, DisplaySnapshot};
pub use error::{ConfigError, RecorderError};
pub use recorder::SessionRecorder;
pub use runner::{ExperimentRunner, TickOutcome};
pub use session::{PendingTrial, Session};
pub use state::{Command, ExperimentEvent, ExperimentStateMachine, MAX_ENTERED_COUNT};
pub use summary::SessionSummary;
