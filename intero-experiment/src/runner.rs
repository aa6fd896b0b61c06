use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use intero_scoring::{ReferenceDataset, score_session};
use intero_signal::{BeatCounter, PeakDetector, SharedEcgBuffer};
use intero_timing::{Clock, TickTimer};
use log::{debug, info, warn};
use rand::Rng;

use crate::display::{DisplayHandle, DisplaySnapshot};
use crate::error::RecorderError;
use crate::recorder::SessionRecorder;
use crate::state::{Command, ExperimentEvent, ExperimentStateMachine};
use crate::summary::SessionSummary;

/// What one tick did. Commands are kept even when saving failed, so the
/// caller can still report the trials they describe.
#[derive(Debug)]
pub struct TickOutcome {
    pub commands: Vec<Command>,
    /// First failure to persist a finished session during this tick.
    pub save_error: Option<RecorderError>,
}

/// The timer-driven side of the experiment: advances the state machine,
/// executes its commands and publishes the display snapshot.
pub struct ExperimentRunner<C: Clock, R: Rng, D: PeakDetector> {
    machine: ExperimentStateMachine<C, R>,
    buffer: SharedEcgBuffer,
    counter: BeatCounter<D>,
    recorder: SessionRecorder,
    reference: Option<Arc<ReferenceDataset>>,
    display: DisplayHandle,
    ticks: TickTimer,
    last_summary: Option<SessionSummary>,
    last_record: Option<PathBuf>,
}

impl<C: Clock, R: Rng, D: PeakDetector> ExperimentRunner<C, R, D> {
    pub fn new(
        machine: ExperimentStateMachine<C, R>,
        buffer: SharedEcgBuffer,
        counter: BeatCounter<D>,
        recorder: SessionRecorder,
        reference: Option<Arc<ReferenceDataset>>,
    ) -> Self {
        Self {
            machine,
            buffer,
            counter,
            recorder,
            reference,
            display: DisplayHandle::new(),
            ticks: TickTimer::default(),
            last_summary: None,
            last_record: None,
        }
    }

    pub fn machine(&self) -> &ExperimentStateMachine<C, R> {
        &self.machine
    }

    pub fn display(&self) -> DisplayHandle {
        self.display.clone()
    }

    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    /// Where the most recent session was saved, if it was.
    pub fn last_record(&self) -> Option<&Path> {
        self.last_record.as_deref()
    }

    /// One tick: timer events first, then participant input, in arrival order.
    ///
    /// Every event is processed even if saving a session fails.
    pub fn tick(&mut self, inputs: impl IntoIterator<Item = ExperimentEvent>) -> TickOutcome {
        self.ticks.record_tick(self.machine.clock().now());

        let mut executed = Vec::new();
        let mut save_error = None;
        for event in self.machine.update().into_iter().chain(inputs) {
            for command in self.machine.handle_event(event) {
                if let Err(e) = self.execute(&command) {
                    warn!("{e}");
                    save_error.get_or_insert(e);
                }
                executed.push(command);
            }
        }
        self.publish();

        TickOutcome {
            commands: executed,
            save_error,
        }
    }

    fn execute(&mut self, command: &Command) -> Result<(), RecorderError> {
        match command {
            Command::StageEntered(stage) => debug!("entered {stage}"),
            Command::CountBeats {
                trial_id,
                start,
                end,
            } => {
                let config = self.machine.config();
                let beats = self.counter.extract_and_count(
                    &self.buffer,
                    *start,
                    *end,
                    config.sampling_rate_hz,
                );
                if let Some(skew) = beats.skew() {
                    if skew.max_abs() > config.skew_warn_s {
                        warn!(
                            "trial {trial_id}: window skew start {:.3} s, end {:.3} s exceeds {:.3} s",
                            skew.start_s, skew.end_s, config.skew_warn_s
                        );
                    }
                }
                self.machine
                    .record_measurement(*trial_id, beats.count, beats.skew());
            }
            Command::ScoreFailed { .. } | Command::TrialCompleted(_) => {}
            Command::FinalizeSession {
                trial_lengths,
                trials,
            } => {
                let scores = score_session(trials, self.reference.as_deref());
                let summary =
                    SessionSummary::new(Local::now(), trial_lengths.clone(), trials.clone(), &scores);

                let stats = self.ticks.stats();
                info!(
                    "tick interval {:.2} ms, jitter {:.2} ms over {} ticks",
                    stats.average_interval_ms, stats.jitter_ms, stats.ticks
                );
                self.ticks.reset();

                self.last_summary = Some(summary.clone());
                self.last_record = None;
                let path = self.recorder.save(&summary)?;
                self.last_record = Some(path);
            }
        }
        Ok(())
    }

    fn publish(&self) {
        let snapshot = self.buffer.snapshot();
        let stage = self.machine.stage();
        self.display.publish(DisplaySnapshot {
            stage,
            prompt: stage.prompt(),
            countdown: self.machine.countdown_display(),
            trial_progress: self.machine.trial_progress(),
            entered_count: self.machine.entered_count(),
            last_summary: self.last_summary.clone(),
            times_relative_s: snapshot.times_relative(),
            values: snapshot.values,
        });
    }
}
