use serde::{Deserialize, Serialize};

/// Stages of the heartbeat counting protocol, in the order a session walks them.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Scanning,
    Initialising,
    SessionIntro,
    ReadyToStart,
    RecordingBeats,
    RecordingInput,
    RecordingConfidence,
    Results,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Scanning
    }
}

impl Stage {
    /// Stages left by a timer rather than by the participant.
    pub fn is_timed(&self) -> bool {
        matches!(self, Self::Initialising | Self::RecordingBeats)
    }

    pub fn accepts_count(&self) -> bool {
        matches!(self, Self::RecordingInput)
    }

    pub fn accepts_confidence(&self) -> bool {
        matches!(self, Self::RecordingConfidence)
    }

    /// Participant-facing instruction for the stage.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Scanning => "Connecting to sensor...",
            Self::Initialising => "Sensor connected, waiting for a stable signal...",
            Self::SessionIntro => {
                "Sit still and breathe normally.\nPress enter when you are ready to begin"
            }
            Self::ReadyToStart => "Press start and begin heart beat counting",
            Self::RecordingBeats => "Count your heart beats\nWithout checking your pulse",
            Self::RecordingInput => "Enter how many heart beats you counted",
            Self::RecordingConfidence => {
                "How confident are you in your count? (0 = guess, 1 = certain)"
            }
            Self::Results => "Finished",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Scanning => "SCANNING",
            Self::Initialising => "INITIALISING",
            Self::SessionIntro => "SESSION_INTRO",
            Self::ReadyToStart => "READY_TO_START",
            Self::RecordingBeats => "RECORDING_BEATS",
            Self::RecordingInput => "RECORDING_INPUT",
            Self::RecordingConfidence => "RECORDING_CONFIDENCE",
            Self::Results => "RESULTS",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
