use std::sync::Arc;

use intero_core::Stage;
use parking_lot::RwLock;

use crate::summary::SessionSummary;

/// Everything a presentation layer needs for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplaySnapshot {
    pub stage: Stage,
    pub prompt: &'static str,
    /// `mm:ss`, only while beats are being recorded.
    pub countdown: Option<String>,
    pub trial_progress: Option<(usize, usize)>,
    pub entered_count: Option<u32>,
    pub last_summary: Option<SessionSummary>,
    /// Seconds before the newest sample, all `<= 0`.
    pub times_relative_s: Vec<f64>,
    pub values: Vec<f64>,
}

/// Pull-based view of the latest published snapshot.
#[derive(Debug, Clone, Default)]
pub struct DisplayHandle {
    inner: Arc<RwLock<DisplaySnapshot>>,
}

impl DisplayHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, snapshot: DisplaySnapshot) {
        *self.inner.write() = snapshot;
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        self.inner.read().clone()
    }

    pub fn stage(&self) -> Stage {
        self.inner.read().stage
    }
}
