use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use intero_core::Stage;
use intero_experiment::{
    Command, ExperimentConfig, ExperimentEvent, ExperimentRunner, ExperimentStateMachine,
    RecorderError, SessionRecorder, SessionSummary,
};
use intero_scoring::trial_accuracy;
use intero_signal::{BeatCounter, ChannelStream, SampleIngestor, SensorFeed, SharedEcgBuffer};
use intero_timing::{Clock, ManualClock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

const RATE_HZ: f64 = 8.0;
const START: f64 = 100.0;

type Detector = fn(&[f64], f64) -> Vec<usize>;

/// One peak per second of signal at 8 Hz.
fn every_eighth(signal: &[f64], _sampling_rate: f64) -> Vec<usize> {
    (0..signal.len()).step_by(8).collect()
}

struct Rig {
    runner: ExperimentRunner<ManualClock, StdRng, Detector>,
    clock: ManualClock,
    buffer: SharedEcgBuffer,
    feed: SensorFeed,
    ingestor: SampleIngestor<ChannelStream>,
    next_sample: u64,
    stream_samples: bool,
    _tmp: TempDir,
}

impl Rig {
    fn new(lengths: Vec<u64>, output_dir: Option<PathBuf>) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let config = ExperimentConfig {
            trials_per_session: lengths.len(),
            trial_lengths_s: lengths,
            sampling_rate_hz: RATE_HZ,
            history_seconds: 600,
            output_dir: output_dir.unwrap_or_else(|| tmp.path().join("session_data")),
            ..Default::default()
        };
        config.validate().unwrap();

        let clock = ManualClock::new(START);
        let buffer = SharedEcgBuffer::with_capacity(config.buffer_capacity()).unwrap();
        let (feed, stream) = ChannelStream::pair();
        let mut ingestor = SampleIngestor::new(stream, buffer.clone());
        ingestor.start().unwrap();

        let recorder = SessionRecorder::new(config.output_dir.clone());
        let machine = ExperimentStateMachine::new(config, clock.clone(), StdRng::seed_from_u64(11));
        let runner = ExperimentRunner::new(
            machine,
            buffer.clone(),
            BeatCounter::new(every_eighth as Detector),
            recorder,
            None,
        );

        Self {
            runner,
            clock,
            buffer,
            feed,
            ingestor,
            next_sample: 0,
            stream_samples: true,
            _tmp: tmp,
        }
    }

    /// Sensor samples up to the current time, then one drain.
    fn stream(&mut self) {
        if self.stream_samples {
            loop {
                let t = START + self.next_sample as f64 / RATE_HZ;
                if t > self.clock.now() {
                    break;
                }
                assert!(self.feed.push(t, self.next_sample as f64));
                self.next_sample += 1;
            }
        }
        self.ingestor.drain().unwrap();
    }

    fn wait(&mut self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
        self.tick(&[]);
    }

    fn tick(&mut self, events: &[ExperimentEvent]) {
        self.stream();
        let outcome = self.runner.tick(events.iter().copied());
        assert!(outcome.save_error.is_none(), "{:?}", outcome.save_error);
    }

    fn stage(&self) -> Stage {
        self.runner.display().stage()
    }

    fn to_ready(&mut self) {
        self.tick(&[ExperimentEvent::SensorConnected]);
        assert_eq!(self.stage(), Stage::Initialising);
        self.wait(4);
        assert_eq!(self.stage(), Stage::SessionIntro);
        self.tick(&[ExperimentEvent::Advance]);
        assert_eq!(self.stage(), Stage::ReadyToStart);
    }

    /// Counts beats for `length` seconds; returns the measured count.
    fn record_beats(&mut self, length: u64) -> u32 {
        self.tick(&[ExperimentEvent::Advance]);
        assert_eq!(self.stage(), Stage::RecordingBeats);
        self.wait(length);
        assert_eq!(self.stage(), Stage::RecordingInput);
        self.runner.machine().pending().unwrap().count_measured.unwrap()
    }
}

#[test]
fn full_session_is_scored_and_saved() {
    let mut rig = Rig::new(vec![10, 20, 30], None);
    rig.to_ready();
    let order = rig.runner.machine().session().trial_lengths().to_vec();

    let offsets = [2i64, 0, -3];
    let confidences = [0.8, 0.5, 0.9];
    let mut accuracies = Vec::new();

    for (i, &len) in order.iter().enumerate() {
        let measured = rig.record_beats(len);
        // closed window over len seconds at 8 Hz holds 8 * len + 1 samples
        assert_eq!(measured as u64, len + 1);

        let snapshot = rig.runner.display().snapshot();
        assert_eq!(snapshot.trial_progress, Some((i + 1, 3)));

        let entered = (measured as i64 + offsets[i]) as u32;
        accuracies.push(trial_accuracy(measured, entered).unwrap());
        rig.tick(&[
            ExperimentEvent::CountEntered(entered),
            ExperimentEvent::Advance,
            ExperimentEvent::ConfidenceEntered(confidences[i]),
            ExperimentEvent::Advance,
        ]);
    }

    assert_eq!(rig.stage(), Stage::Results);
    let path = rig.runner.last_record().unwrap().to_path_buf();
    let saved: SessionSummary = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(saved.trial_lengths, order);
    assert_eq!(saved.trials.len(), 3);
    let expected = accuracies.iter().sum::<f64>() / 3.0;
    assert!((saved.average_accuracy.unwrap() - expected).abs() < 1e-12);
    let r = saved.awareness_score.unwrap();
    assert!((-1.0..=1.0).contains(&r));
    assert!(saved.awareness_p_value.is_some());
    assert_eq!(saved.accuracy_percentile, None);
    assert!(saved.errors.is_empty());
    for trial in &saved.trials {
        let skew = trial.skew.unwrap();
        assert_eq!(skew.start_s, 0.0);
        assert_eq!(skew.end_s, 0.0);
    }

    let snapshot = rig.runner.display().snapshot();
    assert!(snapshot.last_summary.is_some());
    assert_eq!(snapshot.times_relative_s.last(), Some(&0.0));
    assert_eq!(snapshot.values.len(), snapshot.times_relative_s.len());
}

#[test]
fn new_session_keeps_the_signal_history() {
    let mut rig = Rig::new(vec![10], None);
    rig.to_ready();
    let measured = rig.record_beats(10);
    rig.tick(&[
        ExperimentEvent::CountEntered(measured),
        ExperimentEvent::Advance,
        ExperimentEvent::ConfidenceEntered(0.4),
        ExperimentEvent::Advance,
    ]);
    assert_eq!(rig.stage(), Stage::Results);
    let before = rig.buffer.total_pushed();

    assert!(rig.runner.tick([ExperimentEvent::Advance]).save_error.is_none());
    assert_eq!(rig.stage(), Stage::SessionIntro);
    assert_eq!(rig.runner.machine().session().completed(), 0);
    assert_eq!(rig.buffer.total_pushed(), before);
}

#[test]
fn empty_window_counts_zero_and_flags_session() {
    let mut rig = Rig::new(vec![10], None);
    rig.stream_samples = false;
    rig.to_ready();

    let measured = rig.record_beats(10);
    assert_eq!(measured, 0);
    assert_eq!(rig.runner.machine().pending().unwrap().skew, None);

    rig.tick(&[
        ExperimentEvent::CountEntered(0),
        ExperimentEvent::Advance,
        ExperimentEvent::ConfidenceEntered(0.3),
        ExperimentEvent::Advance,
    ]);
    let summary = rig.runner.last_summary().unwrap();
    assert_eq!(summary.average_accuracy, None);
    assert_eq!(summary.awareness_score, None);
    assert_eq!(summary.trials[0].accuracy, None);
    assert!(!summary.errors.is_empty());
}

#[test]
fn save_failure_reaches_the_caller() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let mut rig = Rig::new(vec![10], Some(blocker.path().join("session_data")));
    rig.to_ready();
    let measured = rig.record_beats(10);

    rig.stream();
    let outcome = rig.runner.tick([
        ExperimentEvent::CountEntered(measured),
        ExperimentEvent::Advance,
        ExperimentEvent::ConfidenceEntered(0.6),
        ExperimentEvent::Advance,
    ]);
    assert!(matches!(
        outcome.save_error,
        Some(RecorderError::CreateDir { .. })
    ));
    // the last trial is still reported
    assert!(outcome.commands.iter().any(|c| matches!(
        c,
        Command::TrialCompleted(record) if record.count_entered == measured
    )));
    assert!(outcome
        .commands
        .iter()
        .any(|c| matches!(c, Command::FinalizeSession { .. })));
    assert_eq!(rig.stage(), Stage::Results);
    assert!(rig.runner.last_summary().is_some());
    assert!(rig.runner.last_record().is_none());
}
