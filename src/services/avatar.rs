use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::error::AvatarError;
use crate::kernel::event::{AvatarSignal, Event, InputEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Streaming avatar SDK surface.
///
/// Talking state is reported separately as `AvatarSignal`s on the event channel;
/// `speak` returns once the utterance has been handed to the SDK. Sessions are
/// stopped by id so a late stop can never tear down a newer session.
#[async_trait]
pub trait AvatarClient: Send + Sync {
    async fn start_session(&self, token: &str) -> Result<SessionId, AvatarError>;
    async fn speak(&self, text: &str) -> Result<(), AvatarError>;
    async fn interrupt(&self) -> Result<(), AvatarError>;
    async fn stop_session(&self, id: SessionId) -> Result<(), AvatarError>;
}

/// Terminal stand-in: prints utterances and simulates talk time.
pub struct ConsoleAvatar {
    events: mpsc::Sender<Event>,
    per_char: Duration,
    session: Mutex<Option<SessionId>>,
    playback: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleAvatar {
    pub fn new(events: mpsc::Sender<Event>) -> Self {
        Self {
            events,
            per_char: Duration::from_millis(60),
            session: Mutex::new(None),
            playback: Mutex::new(None),
        }
    }

    fn has_session(&self) -> bool {
        self.session.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    fn take_playback(&self) -> Option<JoinHandle<()>> {
        self.playback.lock().ok().and_then(|mut p| p.take())
    }

    async fn signal(&self, signal: AvatarSignal) {
        let _ = self.events.send(Event::Input(InputEvent::Avatar(signal))).await;
    }
}

#[async_trait]
impl AvatarClient for ConsoleAvatar {
    async fn start_session(&self, _token: &str) -> Result<SessionId, AvatarError> {
        let id = SessionId::new();
        self.session
            .lock()
            .map_err(|e| AvatarError::Sdk(e.to_string()))?
            .replace(id);
        info!(session = %id.0, "console avatar session started");
        self.signal(AvatarSignal::StreamReady(id)).await;
        Ok(id)
    }

    async fn speak(&self, text: &str) -> Result<(), AvatarError> {
        if !self.has_session() {
            return Err(AvatarError::NoSession);
        }
        println!("[AVATAR] {}", text);
        self.signal(AvatarSignal::StartTalking).await;

        let events = self.events.clone();
        let talk_time = self.per_char * text.chars().count() as u32;
        let task = tokio::spawn(async move {
            tokio::time::sleep(talk_time).await;
            let _ = events
                .send(Event::Input(InputEvent::Avatar(AvatarSignal::StopTalking)))
                .await;
        });
        if let Ok(mut playback) = self.playback.lock() {
            if let Some(previous) = playback.replace(task) {
                previous.abort();
            }
        }
        Ok(())
    }

    async fn interrupt(&self) -> Result<(), AvatarError> {
        if let Some(task) = self.take_playback() {
            if !task.is_finished() {
                task.abort();
                self.signal(AvatarSignal::StopTalking).await;
            }
        }
        Ok(())
    }

    async fn stop_session(&self, id: SessionId) -> Result<(), AvatarError> {
        let stopped = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| AvatarError::Sdk(e.to_string()))?;
            if *session == Some(id) {
                session.take()
            } else {
                None
            }
        };
        let Some(stopped) = stopped else {
            info!(session = %id.0, "console avatar session already gone");
            return Ok(());
        };
        self.interrupt().await?;
        self.signal(AvatarSignal::StreamDisconnected(stopped)).await;
        Ok(())
    }
}
