use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Host wall clock used to stamp window bounds and drive timers.
pub trait Clock: Clone + Send + Sync {
    /// Seconds since the Unix epoch.
    fn now(&self) -> f64;
    fn sleep(&self, d: Duration);

    fn elapsed(&self, since: f64) -> Duration {
        Duration::from_secs_f64((self.now() - since).max(0.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default()
    }

    fn sleep(&self, d: Duration) {
        high_precision_sleep(d)
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    pub fn set(&self, t: f64) {
        self.bits.store(t.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, d: Duration) {
        self.set(self.now() + d.as_secs_f64());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }

    /// Sleeping a manual clock advances it instead of blocking.
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(all(feature = "high_precision_timer", target_os = "linux"))]
pub fn high_precision_sleep(duration: Duration) {
    use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

    let req = timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };

    unsafe {
        clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
    }
}

#[cfg(not(all(feature = "high_precision_timer", target_os = "linux")))]
pub fn high_precision_sleep(duration: Duration) {
    std::thread::sleep(duration);
}

/// Interval statistics of the controller tick loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TickStats {
    pub ticks: usize,
    pub average_interval_ms: f64,
    pub jitter_ms: f64,
    pub min_interval_ms: f64,
    pub max_interval_ms: f64,
}

/// Records the spacing between consecutive ticks, keeping the most recent `max_samples`.
#[derive(Debug, Clone)]
pub struct TickTimer {
    last_tick: Option<f64>,
    intervals: Vec<Duration>,
    max_samples: usize,
}

impl TickTimer {
    pub fn new(max_samples: usize) -> Self {
        Self {
            last_tick: None,
            intervals: Vec::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record_tick(&mut self, now: f64) {
        if let Some(prev) = self.last_tick {
            if self.intervals.len() >= self.max_samples {
                self.intervals.remove(0);
            }
            self.intervals
                .push(Duration::from_secs_f64((now - prev).max(0.0)));
        }
        self.last_tick = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_tick = None;
        self.intervals.clear();
    }

    pub fn stats(&self) -> TickStats {
        let times: Vec<f64> = self
            .intervals
            .iter()
            .map(|d| d.as_secs_f64() * 1e3)
            .collect();
        if times.is_empty() {
            return TickStats {
                ticks: 0,
                average_interval_ms: 0.0,
                jitter_ms: 0.0,
                min_interval_ms: 0.0,
                max_interval_ms: 0.0,
            };
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        TickStats {
            ticks: times.len(),
            average_interval_ms: avg,
            jitter_ms: var.sqrt(),
            min_interval_ms: times.iter().copied().fold(f64::INFINITY, f64::min),
            max_interval_ms: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(1000)
    }
}
