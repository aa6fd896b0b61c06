use intero_core::BoundarySkew;

/// Contiguous run of buffered samples selected by a host-clock interval.
#[derive(Debug, Clone, PartialEq)]
pub struct EcgWindow {
    pub requested_start: f64,
    pub requested_end: f64,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl EcgWindow {
    pub fn empty(requested_start: f64, requested_end: f64) -> Self {
        Self {
            requested_start,
            requested_end,
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn first_time(&self) -> Option<f64> {
        self.times.first().copied()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.times.last().copied()
    }

    /// Span covered by the returned samples, which can differ from the requested span.
    pub fn actual_duration(&self) -> f64 {
        match (self.first_time(), self.last_time()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    pub fn requested_duration(&self) -> f64 {
        (self.requested_end - self.requested_start).max(0.0)
    }

    /// Requested bound minus actual first/last sample time. `None` for an empty window.
    pub fn skew(&self) -> Option<BoundarySkew> {
        Some(BoundarySkew {
            start_s: self.requested_start - self.first_time()?,
            end_s: self.requested_end - self.last_time()?,
        })
    }
}
