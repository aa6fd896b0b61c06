use serde::{Deserialize, Serialize};

/// One ECG reading stamped with the sensor device clock, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(t: f64, value: f64) -> Self {
        Self { t, value }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((t, value): (f64, f64)) -> Self {
        Self { t, value }
    }
}

/// Requested window bound minus the timestamp of the first/last sample actually
/// returned. Requested bounds come from the host clock and buffered timestamps
/// from the device clock, so a steady non-zero value is expected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundarySkew {
    pub start_s: f64,
    pub end_s: f64,
}

impl BoundarySkew {
    pub fn max_abs(&self) -> f64 {
        self.start_s.abs().max(self.end_s.abs())
    }
}
