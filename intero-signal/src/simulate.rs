use std::f64::consts::PI;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use intero_core::Sample;
use intero_timing::Clock;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::source::SensorFeed;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub sampling_rate_hz: f64,
    pub heart_rate_bpm: f64,
    /// Beat-to-beat RR standard deviation in seconds.
    pub rr_sd_s: f64,
    pub noise_amplitude: f64,
    /// Amplitude scale, in the sensor's microvolt-like units.
    pub amplitude: f64,
    /// Offset of the device clock relative to the host clock.
    pub clock_offset_s: f64,
    /// Samples delivered together, like a BLE notification.
    pub packet_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 130.0,
            heart_rate_bpm: 68.0,
            rr_sd_s: 0.04,
            noise_amplitude: 0.02,
            amplitude: 1000.0,
            clock_offset_s: -0.015,
            packet_size: 73,
        }
    }
}

/// Synthetic ECG built from Gaussian P, Q, R, S and T waves.
pub struct SimulatedEcg {
    config: SimulationConfig,
    rng: StdRng,
    phase: f64,
    rr: f64,
    emitted: u64,
}

impl SimulatedEcg {
    pub fn new(config: SimulationConfig, seed: u64) -> Self {
        let rr = 60.0 / config.heart_rate_bpm;
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            phase: 0.0,
            rr,
            emitted: 0,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.random::<f64>().max(1e-10);
        let u2: f64 = self.rng.random();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn pulse(t: f64, center: f64, width: f64, amplitude: f64) -> f64 {
        let x = (t - center) / width;
        amplitude * (-0.5 * x * x).exp()
    }

    /// PQRST shape at `t` seconds from the R wave.
    fn waveform(t: f64) -> f64 {
        Self::pulse(t, -0.20, 0.025, 0.12)
            + Self::pulse(t, -0.03, 0.008, -0.15)
            + Self::pulse(t, 0.0, 0.010, 1.0)
            + Self::pulse(t, 0.03, 0.008, -0.25)
            + Self::pulse(t, 0.25, 0.045, 0.25)
    }

    fn next_rr(&mut self) -> f64 {
        let base = 60.0 / self.config.heart_rate_bpm;
        (base + self.config.rr_sd_s * self.gaussian()).max(0.3)
    }

    pub fn next_value(&mut self) -> f64 {
        let dt = 1.0 / self.config.sampling_rate_hz;
        self.phase += dt;
        if self.phase >= self.rr {
            self.phase -= self.rr;
            self.rr = self.next_rr();
        }
        self.emitted += 1;
        // R wave sits at mid-cycle
        let t = self.phase - self.rr / 2.0;
        let noise = self.config.noise_amplitude * self.gaussian();
        (Self::waveform(t) + noise) * self.config.amplitude
    }

    /// Produces packets of samples in real time until the consumer goes away.
    ///
    /// Waits for the stream to be started, then stamps each sample with the
    /// host clock shifted by `clock_offset_s`. A packet is pushed only after
    /// the host clock has passed its last sample.
    pub fn spawn<C: Clock + 'static>(mut self, feed: SensorFeed, clock: C) -> JoinHandle<u64> {
        thread::spawn(move || {
            while !feed.is_streaming() {
                clock.sleep(Duration::from_millis(10));
            }
            info!(
                "simulated sensor streaming at {} Hz",
                self.config.sampling_rate_hz
            );
            let dt = 1.0 / self.config.sampling_rate_hz;
            let packet = self.config.packet_size.max(1);
            let mut next_t = clock.now() + self.config.clock_offset_s;
            loop {
                let samples: Vec<Sample> = (0..packet)
                    .map(|i| Sample::new(next_t + i as f64 * dt, self.next_value()))
                    .collect();
                next_t += packet as f64 * dt;

                // a packet goes out once its last sample has been acquired
                let acquired = next_t - dt - self.config.clock_offset_s;
                let wait = acquired - clock.now();
                if wait > 0.0 {
                    clock.sleep(Duration::from_secs_f64(wait));
                }
                if !feed.push_batch(samples) {
                    debug!("sensor consumer gone after {} samples", self.emitted);
                    return self.emitted;
                }
            }
        })
    }
}
