use serde_json::Value;

use crate::services::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Starting,
    Active(SessionId),
}

/// Per-session bookkeeping owned by the reactor.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub user_name: Option<String>,
    pub stats: Option<Value>,
    pub greeted: bool,
    /// False once the recognizer reported it cannot run.
    pub voice_enabled: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            voice_enabled: true,
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, SessionPhase::Active(_))
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SessionPhase::Idle
    }

    /// Session torn down; identity survives unless `forget` is set.
    pub fn end(&mut self, forget: bool) {
        self.phase = SessionPhase::Idle;
        self.greeted = false;
        if forget {
            self.user_name = None;
            self.stats = None;
        }
    }
}
