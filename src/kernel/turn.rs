use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Who currently holds the audio channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// Recognizer active, transcripts accepted.
    Listening,
    /// Avatar speaking, or its audio tail has not settled yet.
    Suppressed,
    /// A transcript is being classified and answered.
    Processing,
}

impl Default for TurnState {
    fn default() -> Self {
        Self::Listening
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTiming {
    /// Wait between interrupting the avatar and starting a new utterance.
    pub speech_settle: Duration,
    /// Wait after the avatar stops before the recognizer resumes.
    pub resume_guard: Duration,
}

impl Default for TurnTiming {
    fn default() -> Self {
        Self {
            speech_settle: Duration::from_millis(300),
            resume_guard: Duration::from_millis(500),
        }
    }
}

/// Commands for the driver. The coordinator never touches the recognizer itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    PauseRecognizer,
    ResumeRecognizer,
    ScheduleResume { after: Duration, generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Interim,
    Blank,
    Suppressed,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptDecision {
    Dispatch(String),
    Dropped(DropReason),
}

/// Half-duplex gate between the speech recognizer and avatar playback.
///
/// Only one voice is live at a time: avatar speech pauses the recognizer, and
/// the recognizer only resumes a guard delay after the avatar goes quiet. At
/// most one transcript is in flight; anything arriving meanwhile is dropped.
#[derive(Debug, Clone, Default)]
pub struct TurnCoordinator {
    state: TurnState,
    timing: TurnTiming,
    avatar_speaking: bool,
    in_flight: bool,
    resume_pending: bool,
    resume_generation: u64,
    recognizer_paused: bool,
}

impl TurnCoordinator {
    pub fn new(timing: TurnTiming) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn timing(&self) -> TurnTiming {
        self.timing
    }

    pub fn is_avatar_speaking(&self) -> bool {
        self.avatar_speaking
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn avatar_started_talking(&mut self) -> Vec<TurnAction> {
        self.avatar_speaking = true;
        // Talking again inside the guard window: the queued resume must not fire.
        self.cancel_pending_resume();
        let actions = self.pause();
        self.refresh();
        actions
    }

    pub fn avatar_stopped_talking(&mut self) -> Vec<TurnAction> {
        if !self.avatar_speaking {
            return Vec::new();
        }
        self.avatar_speaking = false;
        // Stay suppressed until the audio tail has drained.
        self.resume_pending = true;
        self.resume_generation += 1;
        self.refresh();
        vec![TurnAction::ScheduleResume {
            after: self.timing.resume_guard,
            generation: self.resume_generation,
        }]
    }

    /// Guard timer fired. Stale generations are ignored.
    pub fn resume_due(&mut self, generation: u64) -> Vec<TurnAction> {
        if !self.resume_pending || generation != self.resume_generation || self.avatar_speaking {
            debug!(generation, current = self.resume_generation, "stale resume ignored");
            return Vec::new();
        }
        self.resume_pending = false;
        let actions = self.resume();
        self.refresh();
        actions
    }

    /// Gate one recognizer result. Dropped results are gone for good.
    pub fn on_transcript(&mut self, text: &str, is_final: bool) -> TranscriptDecision {
        if !is_final {
            return TranscriptDecision::Dropped(DropReason::Interim);
        }
        let text = text.trim();
        if text.is_empty() {
            return TranscriptDecision::Dropped(DropReason::Blank);
        }
        // A paused recognizer can still deliver late results.
        match self.state {
            TurnState::Suppressed => TranscriptDecision::Dropped(DropReason::Suppressed),
            TurnState::Processing => TranscriptDecision::Dropped(DropReason::Busy),
            TurnState::Listening => {
                self.in_flight = true;
                self.refresh();
                TranscriptDecision::Dispatch(text.to_string())
            }
        }
    }

    pub fn dispatch_finished(&mut self) {
        self.in_flight = false;
        self.refresh();
    }

    /// Avatar speech could not be started: reopen the microphone.
    pub fn speech_failed(&mut self) -> Vec<TurnAction> {
        self.avatar_speaking = false;
        self.cancel_pending_resume();
        let actions = self.resume();
        self.refresh();
        actions
    }

    /// Session ended; the driver stops the recognizer on its own.
    pub fn reset(&mut self) {
        self.avatar_speaking = false;
        self.in_flight = false;
        self.recognizer_paused = false;
        self.cancel_pending_resume();
        self.refresh();
    }

    fn cancel_pending_resume(&mut self) {
        self.resume_pending = false;
        self.resume_generation += 1;
    }

    fn pause(&mut self) -> Vec<TurnAction> {
        if self.recognizer_paused {
            return Vec::new();
        }
        self.recognizer_paused = true;
        vec![TurnAction::PauseRecognizer]
    }

    fn resume(&mut self) -> Vec<TurnAction> {
        if !self.recognizer_paused {
            return Vec::new();
        }
        self.recognizer_paused = false;
        vec![TurnAction::ResumeRecognizer]
    }

    // Suppressed > Processing > Listening
    fn refresh(&mut self) {
        self.state = if self.avatar_speaking || self.resume_pending {
            TurnState::Suppressed
        } else if self.in_flight {
            TurnState::Processing
        } else {
            TurnState::Listening
        };
    }
}
