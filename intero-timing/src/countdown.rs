use std::time::Duration;

/// One-shot countdown over host-clock seconds. Only expiry or reset ends it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    started_at: f64,
    duration: Duration,
}

impl Countdown {
    pub fn start(started_at: f64, duration: Duration) -> Self {
        Self {
            started_at,
            duration,
        }
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn deadline(&self) -> f64 {
        self.started_at + self.duration.as_secs_f64()
    }

    pub fn remaining(&self, now: f64) -> Duration {
        Duration::from_secs_f64((self.deadline() - now).max(0.0))
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.deadline()
    }

    /// Whole seconds left, rounded up so the display reads 00:00 only at expiry.
    pub fn remaining_secs(&self, now: f64) -> u64 {
        self.remaining(now).as_secs_f64().ceil() as u64
    }

    /// Remaining time as `mm:ss`.
    pub fn display(&self, now: f64) -> String {
        let secs = self.remaining_secs(now);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_expires_at_deadline() {
        let c = Countdown::start(10.0, Duration::from_secs(25));
        assert!(!c.is_expired(34.999));
        assert!(c.is_expired(35.0));
        assert_eq!(c.remaining(40.0), Duration::ZERO);
    }

    #[test]
    fn display_rounds_up_to_whole_seconds() {
        let c = Countdown::start(0.0, Duration::from_secs(90));
        assert_eq!(c.display(0.0), "01:30");
        assert_eq!(c.display(0.4), "01:30");
        assert_eq!(c.display(1.0), "01:29");
        assert_eq!(c.display(89.5), "00:01");
        assert_eq!(c.display(90.0), "00:00");
    }
}
