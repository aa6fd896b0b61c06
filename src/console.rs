use std::io::{self, BufRead};
use std::thread;

use crossbeam::channel::{Receiver, unbounded};
use intero_core::Stage;
use intero_experiment::ExperimentEvent;
use log::debug;

/// One line typed by the participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserInput {
    Advance,
    Count(u32),
    Confidence(f64),
    Quit,
}

impl UserInput {
    /// Enter or `next` advances, a bare integer is a beat count, `c <x>` a
    /// confidence and `q` quits. Anything else is not an input.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line {
            "" | "n" | "next" => return Some(Self::Advance),
            "q" | "quit" => return Some(Self::Quit),
            _ => {}
        }
        if let Some(rest) = line.strip_prefix('c') {
            return rest.trim().parse().ok().map(Self::Confidence);
        }
        line.parse().ok().map(Self::Count)
    }

    /// Reminder for input the current stage will ignore.
    pub fn misplaced_hint(&self, stage: Stage) -> Option<&'static str> {
        match self {
            Self::Count(_) if !stage.accepts_count() => {
                Some("beat counts are entered after the countdown ends")
            }
            Self::Confidence(_) if !stage.accepts_confidence() => {
                Some("confidence is asked for after the beat count")
            }
            Self::Advance if stage.is_timed() => Some("please wait for the timer"),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<ExperimentEvent> {
        match self {
            Self::Advance => Some(ExperimentEvent::Advance),
            Self::Count(n) => Some(ExperimentEvent::CountEntered(n)),
            Self::Confidence(c) => Some(ExperimentEvent::ConfidenceEntered(c)),
            Self::Quit => None,
        }
    }
}

/// Reads stdin on its own thread so the tick loop never blocks on input.
/// End of input is delivered as `Quit`.
pub fn spawn_stdin_reader() -> Receiver<UserInput> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match UserInput::parse(&line) {
                Some(input) => {
                    if tx.send(input).is_err() {
                        return;
                    }
                }
                None => println!("  ? unrecognised input: {line:?}"),
            }
        }
        debug!("stdin closed");
        let _ = tx.send(UserInput::Quit);
    });
    rx
}
