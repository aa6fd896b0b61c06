use std::time::Duration;

use intero_core::{BoundarySkew, Stage, TrialRecord};
use intero_scoring::{ScoreError, trial_accuracy};
use intero_timing::{Clock, Countdown};
use log::{debug, info, warn};
use rand::Rng;

use crate::config::ExperimentConfig;
use crate::session::{PendingTrial, Session};

/// Largest beat count a participant may enter.
pub const MAX_ENTERED_COUNT: u32 = 999;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExperimentEvent {
    SensorConnected,
    SettleElapsed,
    /// The participant's single "continue" action.
    Advance,
    CountdownExpired,
    CountEntered(u32),
    ConfidenceEntered(f64),
}

/// Side effects requested by a transition, executed by the caller in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StageEntered(Stage),
    /// Count beats over the closed host-clock interval `[start, end]` and
    /// report back through [`ExperimentStateMachine::record_measurement`].
    CountBeats {
        trial_id: usize,
        start: f64,
        end: f64,
    },
    ScoreFailed {
        trial_id: usize,
        error: ScoreError,
    },
    TrialCompleted(TrialRecord),
    FinalizeSession {
        trial_lengths: Vec<u64>,
        trials: Vec<TrialRecord>,
    },
}

/// Drives one participant through the counting protocol.
///
/// `update` turns elapsed timers into events; `handle_event` is total over
/// (stage, event) and returns the commands for the transition it took, or
/// nothing when the event does not apply to the current stage.
pub struct ExperimentStateMachine<C: Clock, R: Rng> {
    stage: Stage,
    clock: C,
    rng: R,
    config: ExperimentConfig,
    session: Session,
    sessions_started: usize,
    settle: Option<Countdown>,
    countdown: Option<Countdown>,
    pending: Option<PendingTrial>,
}

impl<C: Clock, R: Rng> ExperimentStateMachine<C, R> {
    pub fn new(config: ExperimentConfig, clock: C, mut rng: R) -> Self {
        let session = Session::draw(&config.trial_lengths_s, config.trials_per_session, &mut rng);
        Self {
            stage: Stage::Scanning,
            clock,
            rng,
            config,
            session,
            sessions_started: 0,
            settle: None,
            countdown: None,
            pending: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sessions_started(&self) -> usize {
        self.sessions_started
    }

    pub fn pending(&self) -> Option<&PendingTrial> {
        self.pending.as_ref()
    }

    /// Countdown of the trial being recorded, if any.
    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    pub fn countdown_display(&self) -> Option<String> {
        self.countdown.map(|c| c.display(self.clock.now()))
    }

    /// `(k, n)`: trial k of n, while a trial is in progress.
    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        self.pending
            .as_ref()
            .map(|p| (p.trial_id + 1, self.session.total_trials()))
    }

    pub fn entered_count(&self) -> Option<u32> {
        self.pending.as_ref().and_then(|p| p.count_entered)
    }

    pub fn update(&mut self) -> Vec<ExperimentEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();
        match self.stage {
            Stage::Initialising => {
                if self.settle.is_some_and(|c| c.is_expired(now)) {
                    events.push(ExperimentEvent::SettleElapsed);
                }
            }
            Stage::RecordingBeats => {
                if self.countdown.is_some_and(|c| c.is_expired(now)) {
                    events.push(ExperimentEvent::CountdownExpired);
                }
            }
            _ => {}
        }
        events
    }

    pub fn handle_event(&mut self, event: ExperimentEvent) -> Vec<Command> {
        use ExperimentEvent::*;

        let mut commands = Vec::new();
        let next = match (self.stage, event) {
            (Stage::Scanning, SensorConnected) => Some(Stage::Initialising),
            (Stage::Initialising, SettleElapsed) => Some(Stage::SessionIntro),
            (Stage::SessionIntro, Advance) => Some(Stage::ReadyToStart),
            (Stage::ReadyToStart, Advance) if self.pending.is_some() => Some(Stage::RecordingBeats),
            (Stage::RecordingBeats, CountdownExpired) => Some(Stage::RecordingInput),
            (Stage::RecordingInput, CountEntered(n)) => {
                self.enter_count(n);
                None
            }
            (Stage::RecordingInput, Advance) if self.count_ready() => {
                Some(Stage::RecordingConfidence)
            }
            (Stage::RecordingConfidence, ConfidenceEntered(c)) => {
                self.enter_confidence(c);
                None
            }
            (Stage::RecordingConfidence, Advance) if self.confidence_ready() => {
                self.complete_trial(&mut commands);
                if self.session.is_complete() {
                    Some(Stage::Results)
                } else {
                    Some(Stage::ReadyToStart)
                }
            }
            (Stage::Results, Advance) => Some(Stage::SessionIntro),
            (stage, event) => {
                debug!("{event:?} ignored in {stage}");
                None
            }
        };

        if let Some(stage) = next {
            self.enter(stage, &mut commands);
        }
        commands
    }

    /// Attaches the detected beat count for the trial awaiting it.
    ///
    /// Returns false when no trial is waiting for this measurement.
    pub fn record_measurement(
        &mut self,
        trial_id: usize,
        count: u32,
        skew: Option<BoundarySkew>,
    ) -> bool {
        match self.pending.as_mut() {
            Some(p) if p.trial_id == trial_id && p.end_time.is_some() && p.count_measured.is_none() => {
                p.count_measured = Some(count);
                p.skew = skew;
                true
            }
            _ => {
                warn!("unexpected measurement for trial {trial_id} ignored");
                false
            }
        }
    }

    fn enter(&mut self, stage: Stage, commands: &mut Vec<Command>) {
        let now = self.clock.now();
        info!("{} -> {} at {now:.3}", self.stage, stage);
        self.stage = stage;
        commands.push(Command::StageEntered(stage));

        match stage {
            Stage::Scanning | Stage::RecordingConfidence => {}
            Stage::Initialising => {
                self.settle = Some(Countdown::start(now, self.config.settle_delay()));
            }
            Stage::SessionIntro => {
                self.settle = None;
                self.start_session();
            }
            Stage::ReadyToStart => {
                self.pending = self
                    .session
                    .next_length()
                    .map(|len| PendingTrial::new(self.session.completed(), len));
            }
            Stage::RecordingBeats => {
                if let Some(p) = self.pending.as_mut() {
                    p.start_time = Some(now);
                    self.countdown = Some(Countdown::start(now, Duration::from_secs(p.trial_length)));
                    info!(
                        "trial {} of {}: counting for {} s",
                        p.trial_id + 1,
                        self.session.total_trials(),
                        p.trial_length
                    );
                }
            }
            Stage::RecordingInput => {
                self.countdown = None;
                if let Some(p) = self.pending.as_mut() {
                    p.end_time = Some(now);
                    if let Some(start) = p.start_time {
                        commands.push(Command::CountBeats {
                            trial_id: p.trial_id,
                            start,
                            end: now,
                        });
                    }
                }
            }
            Stage::Results => {
                self.pending = None;
                info!(
                    "session {} finished with {} trials",
                    self.sessions_started,
                    self.session.completed()
                );
                commands.push(Command::FinalizeSession {
                    trial_lengths: self.session.trial_lengths().to_vec(),
                    trials: self.session.trials().to_vec(),
                });
            }
        }
    }

    /// Fresh trial order and no trials. The ring buffer is not touched.
    fn start_session(&mut self) {
        self.session = Session::draw(
            &self.config.trial_lengths_s,
            self.config.trials_per_session,
            &mut self.rng,
        );
        self.sessions_started += 1;
        self.pending = None;
        self.countdown = None;
        info!(
            "session {} trial lengths {:?}",
            self.sessions_started,
            self.session.trial_lengths()
        );
    }

    fn enter_count(&mut self, n: u32) {
        if n > MAX_ENTERED_COUNT {
            warn!("beat count {n} out of range 0..={MAX_ENTERED_COUNT}, ignored");
            return;
        }
        if let Some(p) = self.pending.as_mut() {
            p.count_entered = Some(n);
        }
    }

    fn enter_confidence(&mut self, confidence: f64) {
        if !(0.0..=1.0).contains(&confidence) {
            warn!("confidence {confidence} outside [0, 1], ignored");
            return;
        }
        if let Some(p) = self.pending.as_mut() {
            p.confidence = Some(confidence);
        }
    }

    fn count_ready(&self) -> bool {
        match &self.pending {
            Some(p) if p.count_entered.is_some() && p.count_measured.is_none() => {
                warn!("trial {} has no beat measurement yet", p.trial_id);
                false
            }
            Some(p) => p.count_entered.is_some(),
            None => false,
        }
    }

    fn confidence_ready(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| p.confidence.is_some())
    }

    fn complete_trial(&mut self, commands: &mut Vec<Command>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let (Some(measured), Some(entered)) = (pending.count_measured, pending.count_entered) else {
            return;
        };

        let accuracy = match trial_accuracy(measured, entered) {
            Ok(a) => Some(a),
            Err(error) => {
                warn!("trial {}: {error}", pending.trial_id);
                commands.push(Command::ScoreFailed {
                    trial_id: pending.trial_id,
                    error,
                });
                None
            }
        };

        if let Some(record) = pending.finish(accuracy) {
            info!(
                "trial {} done: measured {}, entered {}, confidence {:.2}",
                record.trial_id, record.count_measured, record.count_entered, record.confidence
            );
            self.session.append(record.clone());
            commands.push(Command::TrialCompleted(record));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intero_timing::ManualClock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    type Machine = ExperimentStateMachine<ManualClock, StdRng>;

    fn machine(lengths: Vec<u64>, trials: usize) -> (Machine, ManualClock) {
        let config = ExperimentConfig {
            trials_per_session: trials,
            trial_lengths_s: lengths,
            settle_delay_ms: 4000,
            ..Default::default()
        };
        let clock = ManualClock::new(100.0);
        let m = ExperimentStateMachine::new(config, clock.clone(), StdRng::seed_from_u64(3));
        (m, clock)
    }

    fn to_ready(m: &mut Machine, clock: &ManualClock) {
        m.handle_event(ExperimentEvent::SensorConnected);
        clock.advance(Duration::from_secs(4));
        for e in m.update() {
            m.handle_event(e);
        }
        m.handle_event(ExperimentEvent::Advance);
        assert_eq!(m.stage(), Stage::ReadyToStart);
    }

    fn count_beats(commands: &[Command]) -> Vec<(usize, f64, f64)> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::CountBeats {
                    trial_id,
                    start,
                    end,
                } => Some((*trial_id, *start, *end)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn settle_delay_is_timed() {
        let (mut m, clock) = machine(vec![30], 1);
        assert!(m.handle_event(ExperimentEvent::Advance).is_empty());
        assert_eq!(m.stage(), Stage::Scanning);

        m.handle_event(ExperimentEvent::SensorConnected);
        assert_eq!(m.stage(), Stage::Initialising);
        clock.advance(Duration::from_millis(3999));
        assert!(m.update().is_empty());
        // participant cannot skip the settle delay
        assert!(m.handle_event(ExperimentEvent::Advance).is_empty());

        clock.advance(Duration::from_millis(1));
        assert_eq!(m.update(), vec![ExperimentEvent::SettleElapsed]);
        m.handle_event(ExperimentEvent::SettleElapsed);
        assert_eq!(m.stage(), Stage::SessionIntro);
        assert_eq!(m.sessions_started(), 1);
    }

    #[test]
    fn countdown_expiry_counts_beats_once() {
        let (mut m, clock) = machine(vec![30], 1);
        to_ready(&mut m, &clock);
        let start = clock.now();

        let commands = m.handle_event(ExperimentEvent::Advance);
        assert_eq!(m.stage(), Stage::RecordingBeats);
        assert_eq!(commands, vec![Command::StageEntered(Stage::RecordingBeats)]);
        assert_eq!(m.countdown_display().as_deref(), Some("00:30"));

        clock.advance(Duration::from_secs(29));
        assert!(m.update().is_empty());
        clock.advance(Duration::from_secs(1));
        let events = m.update();
        assert_eq!(events, vec![ExperimentEvent::CountdownExpired]);

        let commands = m.handle_event(events[0]);
        assert_eq!(m.stage(), Stage::RecordingInput);
        assert_eq!(count_beats(&commands), vec![(0, start, start + 30.0)]);

        // the same event anywhere else is a no-op
        assert!(m.handle_event(ExperimentEvent::CountdownExpired).is_empty());
        assert_eq!(m.stage(), Stage::RecordingInput);
    }

    #[test]
    fn countdown_expired_ignored_outside_recording() {
        let (mut m, clock) = machine(vec![30], 1);
        assert!(m.handle_event(ExperimentEvent::CountdownExpired).is_empty());
        m.handle_event(ExperimentEvent::SensorConnected);
        assert!(m.handle_event(ExperimentEvent::CountdownExpired).is_empty());
        assert_eq!(m.stage(), Stage::Initialising);
        clock.advance(Duration::from_secs(4));
        m.handle_event(ExperimentEvent::SettleElapsed);
        assert!(m.handle_event(ExperimentEvent::CountdownExpired).is_empty());
        m.handle_event(ExperimentEvent::Advance);
        assert!(m.handle_event(ExperimentEvent::CountdownExpired).is_empty());
        assert_eq!(m.stage(), Stage::ReadyToStart);
    }

    #[test]
    fn input_stages_require_values() {
        let (mut m, clock) = machine(vec![30], 1);
        to_ready(&mut m, &clock);
        m.handle_event(ExperimentEvent::Advance);
        clock.advance(Duration::from_secs(30));
        m.handle_event(ExperimentEvent::CountdownExpired);
        assert!(m.record_measurement(0, 31, None));
        assert!(!m.record_measurement(0, 31, None));

        assert!(m.handle_event(ExperimentEvent::Advance).is_empty());
        m.handle_event(ExperimentEvent::CountEntered(1000));
        assert_eq!(m.entered_count(), None);
        m.handle_event(ExperimentEvent::CountEntered(30));
        assert_eq!(m.entered_count(), Some(30));
        m.handle_event(ExperimentEvent::Advance);
        assert_eq!(m.stage(), Stage::RecordingConfidence);

        assert!(m.handle_event(ExperimentEvent::Advance).is_empty());
        m.handle_event(ExperimentEvent::ConfidenceEntered(1.5));
        assert!(m.handle_event(ExperimentEvent::Advance).is_empty());
        m.handle_event(ExperimentEvent::ConfidenceEntered(0.75));

        let commands = m.handle_event(ExperimentEvent::Advance);
        assert_eq!(m.stage(), Stage::Results);
        let record = commands
            .iter()
            .find_map(|c| match c {
                Command::TrialCompleted(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(record.count_measured, 31);
        assert_eq!(record.count_entered, 30);
        assert_eq!(record.confidence, 0.75);
        assert_eq!(record.trial_length, 30);
        assert!((record.accuracy.unwrap() - (1.0 - 1.0 / 30.5)).abs() < 1e-12);
        assert!(
            commands
                .iter()
                .any(|c| matches!(c, Command::FinalizeSession { trials, .. } if trials.len() == 1))
        );
    }

    #[test]
    fn advance_waits_for_measurement() {
        let (mut m, clock) = machine(vec![30], 1);
        to_ready(&mut m, &clock);
        m.handle_event(ExperimentEvent::Advance);
        m.handle_event(ExperimentEvent::CountdownExpired);
        m.handle_event(ExperimentEvent::CountEntered(12));
        assert!(m.handle_event(ExperimentEvent::Advance).is_empty());
        assert_eq!(m.stage(), Stage::RecordingInput);
        assert!(!m.record_measurement(5, 12, None));
        assert!(m.record_measurement(0, 12, None));
        m.handle_event(ExperimentEvent::Advance);
        assert_eq!(m.stage(), Stage::RecordingConfidence);
    }

    #[test]
    fn zero_counts_flag_degenerate_accuracy() {
        let (mut m, clock) = machine(vec![30], 1);
        to_ready(&mut m, &clock);
        m.handle_event(ExperimentEvent::Advance);
        m.handle_event(ExperimentEvent::CountdownExpired);
        m.record_measurement(0, 0, None);
        m.handle_event(ExperimentEvent::CountEntered(0));
        m.handle_event(ExperimentEvent::Advance);
        m.handle_event(ExperimentEvent::ConfidenceEntered(0.2));
        let commands = m.handle_event(ExperimentEvent::Advance);

        assert!(commands.contains(&Command::ScoreFailed {
            trial_id: 0,
            error: ScoreError::ZeroBeatTotal,
        }));
        assert_eq!(m.session().trials()[0].accuracy, None);
    }

    #[test]
    fn session_loops_and_resets() {
        let (mut m, clock) = machine(vec![25, 35, 45], 3);
        to_ready(&mut m, &clock);
        let order = m.session().trial_lengths().to_vec();

        for (i, &len) in order.iter().enumerate() {
            assert_eq!(m.stage(), Stage::ReadyToStart);
            assert_eq!(m.trial_progress(), Some((i + 1, 3)));
            m.handle_event(ExperimentEvent::Advance);
            assert_eq!(m.countdown().unwrap().duration(), Duration::from_secs(len));
            clock.advance(Duration::from_secs(len));
            for e in m.update() {
                m.handle_event(e);
            }
            m.record_measurement(i, 30, None);
            m.handle_event(ExperimentEvent::CountEntered(28));
            m.handle_event(ExperimentEvent::Advance);
            m.handle_event(ExperimentEvent::ConfidenceEntered(0.5));
            m.handle_event(ExperimentEvent::Advance);
        }
        assert_eq!(m.stage(), Stage::Results);
        assert_eq!(m.session().completed(), 3);

        m.handle_event(ExperimentEvent::Advance);
        assert_eq!(m.stage(), Stage::SessionIntro);
        assert_eq!(m.session().completed(), 0);
        assert_eq!(m.sessions_started(), 2);
        assert_eq!(m.trial_progress(), None);
    }
}
