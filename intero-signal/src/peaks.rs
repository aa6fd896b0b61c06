/// R-peak detection capability: sorted indices of detected beats in `signal`.
pub trait PeakDetector: Send + Sync {
    fn detect_peaks(&self, signal: &[f64], sampling_rate: f64) -> Vec<usize>;
}

impl<F> PeakDetector for F
where
    F: Fn(&[f64], f64) -> Vec<usize> + Send + Sync,
{
    fn detect_peaks(&self, signal: &[f64], sampling_rate: f64) -> Vec<usize> {
        self(signal, sampling_rate)
    }
}

/// Amplitude-threshold detector with a refractory period.
///
/// Removes a moving-average baseline, then keeps local maxima above
/// `mean + threshold_sd * sd` that are at least `refractory_s` apart; inside
/// the refractory period the taller peak wins.
#[derive(Debug, Clone)]
pub struct ThresholdPeakDetector {
    pub threshold_sd: f64,
    pub refractory_s: f64,
    pub baseline_s: f64,
}

impl Default for ThresholdPeakDetector {
    fn default() -> Self {
        Self {
            threshold_sd: 2.0,
            refractory_s: 0.3, // ~200 bpm ceiling
            baseline_s: 0.75,
        }
    }
}

impl ThresholdPeakDetector {
    fn remove_baseline(&self, signal: &[f64], sampling_rate: f64) -> Vec<f64> {
        let half = ((self.baseline_s * sampling_rate) / 2.0).round() as usize;
        if half == 0 {
            return signal.to_vec();
        }
        let mut prefix = Vec::with_capacity(signal.len() + 1);
        prefix.push(0.0);
        for v in signal {
            prefix.push(prefix[prefix.len() - 1] + v);
        }
        (0..signal.len())
            .map(|i| {
                let lo = i.saturating_sub(half);
                let hi = (i + half + 1).min(signal.len());
                let mean = (prefix[hi] - prefix[lo]) / (hi - lo) as f64;
                signal[i] - mean
            })
            .collect()
    }
}

impl PeakDetector for ThresholdPeakDetector {
    fn detect_peaks(&self, signal: &[f64], sampling_rate: f64) -> Vec<usize> {
        if signal.len() < 3 || !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Vec::new();
        }
        let x = self.remove_baseline(signal, sampling_rate);
        let n = x.len() as f64;
        let mean = x.iter().sum::<f64>() / n;
        let sd = (x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        if sd.is_nan() || sd <= 0.0 {
            return Vec::new();
        }
        let threshold = mean + self.threshold_sd * sd;
        let refractory = (self.refractory_s * sampling_rate).round() as usize;

        let mut peaks: Vec<usize> = Vec::new();
        for i in 1..x.len() - 1 {
            if x[i] <= threshold || x[i] < x[i - 1] || x[i] <= x[i + 1] {
                continue;
            }
            match peaks.last_mut() {
                Some(last) if i - *last < refractory => {
                    if x[i] > x[*last] {
                        *last = i;
                    }
                }
                _ => peaks.push(i),
            }
        }
        peaks
    }
}
