use crate::error::{AvatarError, ServiceError, SessionError};
use crate::protocol::HostEnvelope;
use crate::services::SessionId;

#[derive(Debug)]
pub enum Event {
    /// External signals: recognizer, avatar SDK, host page.
    Input(InputEvent),
    /// Results of work the reactor spawned.
    Driver(DriverEvent),
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Transcript { text: String, is_final: bool },
    Avatar(AvatarSignal),
    Host(HostEnvelope),
}

impl InputEvent {
    pub fn final_transcript(text: &str) -> Self {
        Self::Transcript {
            text: text.to_string(),
            is_final: true,
        }
    }

    pub fn interim_transcript(text: &str) -> Self {
        Self::Transcript {
            text: text.to_string(),
            is_final: false,
        }
    }
}

impl From<InputEvent> for Event {
    fn from(input: InputEvent) -> Self {
        Event::Input(input)
    }
}

/// Avatar SDK event surface. Stream signals name the session they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarSignal {
    StreamReady(SessionId),
    StreamDisconnected(SessionId),
    StartTalking,
    StopTalking,
    UserStartTalking,
    UserStopTalking,
    UserMessage(String),
    AvatarMessage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobOrigin {
    /// Started by a transcript; holds the reentrancy guard until done.
    Voice,
    /// Started by a host message.
    Host,
}

/// Identifies one spawned unit of work. Epochs increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobTicket {
    pub epoch: u64,
    pub origin: JobOrigin,
}

#[derive(Debug)]
pub enum DriverEvent {
    ChatReplied {
        ticket: JobTicket,
        /// The transcript forwarded, for free-form turns only.
        user_text: Option<String>,
        result: Result<String, ServiceError>,
    },
    SpeechFinished {
        ticket: JobTicket,
        result: Result<(), AvatarError>,
    },
    ResumeDue {
        generation: u64,
    },
    SessionStarted {
        /// Start attempt this result answers.
        attempt: u64,
        result: Result<SessionId, SessionError>,
    },
}

impl From<DriverEvent> for Event {
    fn from(event: DriverEvent) -> Self {
        Event::Driver(event)
    }
}
