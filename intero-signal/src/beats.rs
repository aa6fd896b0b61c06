use intero_core::BoundarySkew;
use log::{info, warn};

use crate::buffer::SharedEcgBuffer;
use crate::peaks::PeakDetector;
use crate::window::EcgWindow;

/// Outcome of counting beats over one window.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatCount {
    pub count: u32,
    pub window: EcgWindow,
    pub peaks: Vec<usize>,
}

impl BeatCount {
    /// No buffered samples fell inside the window. Not the same as zero detected beats.
    pub fn is_empty_window(&self) -> bool {
        self.window.is_empty()
    }

    pub fn skew(&self) -> Option<BoundarySkew> {
        self.window.skew()
    }

    pub fn measured_values(&self) -> &[f64] {
        &self.window.values
    }

    pub fn measured_times(&self) -> &[f64] {
        &self.window.times
    }

    /// Peak timestamps on the device clock.
    pub fn peak_times(&self) -> Vec<f64> {
        self.peaks
            .iter()
            .filter_map(|&i| self.window.times.get(i).copied())
            .collect()
    }
}

/// Window extraction plus peak detection.
pub struct BeatCounter<D: PeakDetector> {
    detector: D,
}

impl<D: PeakDetector> BeatCounter<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn extract_and_count(
        &self,
        buffer: &SharedEcgBuffer,
        start_time: f64,
        end_time: f64,
        sampling_rate: f64,
    ) -> BeatCount {
        self.count_window(buffer.window(start_time, end_time), sampling_rate)
    }

    /// An empty window counts as zero beats and never reaches the detector.
    pub fn count_window(&self, window: EcgWindow, sampling_rate: f64) -> BeatCount {
        if window.is_empty() {
            warn!(
                "empty window [{:.3}, {:.3}]: no buffered samples, beat count defaults to 0",
                window.requested_start, window.requested_end
            );
            return BeatCount {
                count: 0,
                window,
                peaks: Vec::new(),
            };
        }

        let peaks = self.detector.detect_peaks(&window.values, sampling_rate);
        let count = peaks.len() as u32;
        if let Some(skew) = window.skew() {
            info!(
                "counted {count} R peaks over {} samples ({:.3} s); start error {:.3} s, end error {:.3} s",
                window.len(),
                window.actual_duration(),
                skew.start_s,
                skew.end_s
            );
        }
        BeatCount {
            count,
            window,
            peaks,
        }
    }
}
