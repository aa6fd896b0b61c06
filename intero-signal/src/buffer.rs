use std::sync::Arc;

use intero_core::Sample;
use parking_lot::RwLock;

use crate::error::SignalError;
use crate::window::EcgWindow;

/// Chronological copy of the buffered samples, for plotting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BufferSnapshot {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl BufferSnapshot {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Sample times relative to the newest sample (all values `<= 0`).
    pub fn times_relative(&self) -> Vec<f64> {
        let Some(&newest) = self.times.last() else {
            return Vec::new();
        };
        self.times.iter().map(|t| t - newest).collect()
    }
}

/// Fixed-capacity rolling ECG history.
///
/// `times` and `values` are parallel arrays of length `capacity`, written at a
/// modulo write pointer so a push never shifts existing data. Slots that were
/// never written hold `NaN`.
#[derive(Clone, Debug)]
pub struct EcgRingBuffer {
    times: Vec<f64>,
    values: Vec<f64>,
    head: usize,
    len: usize,
    total_pushed: u64,
}

impl EcgRingBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, SignalError> {
        if capacity == 0 {
            return Err(SignalError::ZeroCapacity);
        }
        Ok(Self {
            times: vec![f64::NAN; capacity],
            values: vec![f64::NAN; capacity],
            head: 0,
            len: 0,
            total_pushed: 0,
        })
    }

    pub fn with_history_seconds(
        sampling_rate_hz: f64,
        history_seconds: f64,
    ) -> Result<Self, SignalError> {
        if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
            return Err(SignalError::InvalidSampleRate(sampling_rate_hz));
        }
        let capacity = (sampling_rate_hz * history_seconds).ceil().max(0.0) as usize;
        Self::with_capacity(capacity)
    }

    pub fn capacity(&self) -> usize {
        self.times.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    /// Overwrites the oldest slot once the buffer is full.
    pub fn push(&mut self, t: f64, value: f64) {
        let capacity = self.capacity();
        self.times[self.head] = t;
        self.values[self.head] = value;
        self.head = (self.head + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
        self.total_pushed += 1;
    }

    pub fn push_sample(&mut self, sample: Sample) {
        self.push(sample.t, sample.value);
    }

    fn oldest_index(&self) -> usize {
        let capacity = self.capacity();
        (self.head + capacity - self.len) % capacity
    }

    /// Filled samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        let start = self.oldest_index();
        let capacity = self.capacity();
        (0..self.len).map(move |i| {
            let idx = (start + i) % capacity;
            Sample::new(self.times[idx], self.values[idx])
        })
    }

    pub fn latest(&self) -> Option<Sample> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.capacity() - 1) % self.capacity();
        Some(Sample::new(self.times[idx], self.values[idx]))
    }

    /// All buffered samples with `start <= t <= end`, in push order.
    ///
    /// An inverted or disjoint interval yields an empty window.
    pub fn window(&self, start: f64, end: f64) -> EcgWindow {
        let mut window = EcgWindow::empty(start, end);
        if start.is_nan() || end.is_nan() || start > end {
            return window;
        }
        for sample in self.iter() {
            if sample.t.is_nan() {
                continue;
            }
            if start <= sample.t && sample.t <= end {
                window.times.push(sample.t);
                window.values.push(sample.value);
            }
        }
        window
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        let mut snap = BufferSnapshot {
            times: Vec::with_capacity(self.len),
            values: Vec::with_capacity(self.len),
        };
        for sample in self.iter() {
            snap.times.push(sample.t);
            snap.values.push(sample.value);
        }
        snap
    }

    /// Raw parallel arrays, unfilled slots included, in storage order.
    pub fn raw(&self) -> (&[f64], &[f64]) {
        (&self.times, &self.values)
    }
}

/// Ring buffer shared between the ingest thread (sole writer) and the controller.
///
/// Readers take a copy under a read lock, so they always see equal-length
/// `times`/`values` that no push can tear.
#[derive(Clone, Debug)]
pub struct SharedEcgBuffer {
    inner: Arc<RwLock<EcgRingBuffer>>,
}

impl SharedEcgBuffer {
    pub fn new(buffer: EcgRingBuffer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer)),
        }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self, SignalError> {
        EcgRingBuffer::with_capacity(capacity).map(Self::new)
    }

    pub fn push(&self, sample: Sample) {
        self.inner.write().push_sample(sample);
    }

    /// Pushes a drained batch under a single write lock.
    pub fn extend(&self, samples: &[Sample]) {
        if samples.is_empty() {
            return;
        }
        let mut buffer = self.inner.write();
        for sample in samples {
            buffer.push_sample(*sample);
        }
    }

    pub fn window(&self, start: f64, end: f64) -> EcgWindow {
        self.inner.read().window(start, end)
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        self.inner.read().snapshot()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.inner.read().latest()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }

    pub fn total_pushed(&self) -> u64 {
        self.inner.read().total_pushed()
    }
}
