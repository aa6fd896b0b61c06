use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use intero_core::Stage;
use intero_experiment::{
    Command, DisplaySnapshot, ExperimentConfig, ExperimentEvent, ExperimentRunner,
    ExperimentStateMachine, SessionRecorder,
};
use intero_scoring::ReferenceDataset;
use intero_signal::{
    BeatCounter, ChannelStream, SampleIngestor, SharedEcgBuffer, SimulatedEcg, SimulationConfig,
    ThresholdPeakDetector,
};
use intero_timing::{Clock, SystemClock};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::console::{self, UserInput};

pub struct App {
    config: ExperimentConfig,
    reference: Option<Arc<ReferenceDataset>>,
    seed: u64,
}

impl App {
    pub fn new(config: ExperimentConfig, reference: Option<Arc<ReferenceDataset>>, seed: Option<u64>) -> Self {
        Self {
            config,
            reference,
            seed: seed.unwrap_or_else(rand::random),
        }
    }

    pub fn run(self) -> Result<()> {
        let clock = SystemClock::new();
        let buffer = SharedEcgBuffer::with_capacity(self.config.buffer_capacity())?;

        let (feed, stream) = ChannelStream::pair();
        let sensor = SimulatedEcg::new(
            SimulationConfig {
                sampling_rate_hz: self.config.sampling_rate_hz,
                ..Default::default()
            },
            self.seed,
        )
        .spawn(feed, clock.clone());
        let ingest = SampleIngestor::new(stream, buffer.clone())
            .spawn(clock.clone(), self.config.ingest_poll());

        let machine = ExperimentStateMachine::new(
            self.config.clone(),
            clock.clone(),
            StdRng::seed_from_u64(self.seed),
        );
        let mut runner = ExperimentRunner::new(
            machine,
            buffer.clone(),
            BeatCounter::new(ThresholdPeakDetector::default()),
            SessionRecorder::new(self.config.output_dir.clone()),
            self.reference.clone(),
        );
        let display = runner.display();
        let input = console::spawn_stdin_reader();

        println!("=== HEARTBEAT COUNTING EXPERIMENT ===");
        println!("Platform: {}", std::env::consts::OS);
        println!("Seed: {}", self.seed);
        println!("Enter = continue, <number> = beat count, c <0..1> = confidence, q = quit\n");

        let mut connected = false;
        let mut sensor_lost = false;
        let mut last_stage = None;
        let mut last_countdown = None;

        loop {
            let mut events = Vec::new();
            if !connected && !buffer.is_empty() {
                connected = true;
                events.push(ExperimentEvent::SensorConnected);
            }

            let mut quit = false;
            let stage = display.stage();
            while let Ok(line) = input.try_recv() {
                if let Some(hint) = line.misplaced_hint(stage) {
                    println!("  ({hint})");
                }
                match line {
                    UserInput::Quit => quit = true,
                    other => events.extend(other.into_event()),
                }
            }
            if quit {
                break;
            }

            let outcome = runner.tick(events);
            self.report(&outcome.commands);
            if let Some(e) = outcome.save_error {
                println!("\nSession could not be saved: {e}");
            }

            let snapshot = display.snapshot();
            if last_stage != Some(snapshot.stage) {
                last_stage = Some(snapshot.stage);
                self.show_stage(&snapshot, runner.last_record());
            }
            match snapshot.countdown {
                Some(countdown) if last_countdown.as_ref() != Some(&countdown) => {
                    println!("  {countdown}");
                    last_countdown = Some(countdown);
                }
                Some(_) => {}
                None => last_countdown = None,
            }

            if !sensor_lost && connected && !ingest.is_running() {
                sensor_lost = true;
                warn!("sensor stream stopped; further trials will have no signal");
            }

            clock.sleep(self.config.refresh_period());
        }

        let report = ingest.join()?;
        info!(
            "ingested {} samples in {} drains, largest backlog {}",
            report.stats.total_samples, report.stats.drains, report.stats.peak_backlog
        );
        if let Some(e) = report.error {
            warn!("ingestion ended with: {e}");
        }
        let emitted = sensor
            .join()
            .map_err(|_| anyhow!("simulated sensor thread panicked"))?;
        info!("simulated sensor emitted {emitted} samples");

        println!("\nExperiment closed. Thank you!");
        Ok(())
    }

    fn report(&self, commands: &[Command]) {
        for command in commands {
            match command {
                Command::TrialCompleted(record) => println!(
                    "  trial {}: you counted {}, {} beats detected",
                    record.trial_id + 1,
                    record.count_entered,
                    record.count_measured
                ),
                Command::ScoreFailed { trial_id, error } => {
                    println!("  trial {}: {error}", trial_id + 1)
                }
                _ => {}
            }
        }
    }

    fn show_stage(&self, snapshot: &DisplaySnapshot, saved_to: Option<&Path>) {
        println!();
        if let Some((k, n)) = snapshot.trial_progress {
            println!("[{}] trial {k} of {n}", snapshot.stage.label());
        } else {
            println!("[{}]", snapshot.stage.label());
        }
        println!("{}", snapshot.prompt);

        if snapshot.stage == Stage::Results {
            if let Some(summary) = &snapshot.last_summary {
                println!("{}", summary.describe());
            }
            match saved_to {
                Some(path) => println!("Saved to {}", path.display()),
                None => println!("Session was not saved."),
            }
            println!("Press enter to start a new session or q to quit");
        }
    }
}
