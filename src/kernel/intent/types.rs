use serde::{Deserialize, Serialize};

pub const UI_CONTROL_CONFIDENCE: f32 = 0.95;
pub const GAME_WITH_ACTION_CONFIDENCE: f32 = 0.95;
pub const GAME_KEYWORD_CONFIDENCE: f32 = 0.85;
pub const INFO_REQUEST_CONFIDENCE: f32 = 0.85;
pub const GENERAL_CHAT_CONFIDENCE: f32 = 0.7;

/// Closed set of ways a transcript can be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    GameStart,
    UiControl,
    InfoRequest,
    GeneralChat,
}

/// Classification result for one transcript.
///
/// `action` is only set for `GameStart` and `UiControl`, `game` only for `GameStart`.
/// `confidence` is a fixed per-branch heuristic, not a probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceIntent {
    #[serde(rename = "type")]
    pub kind: IntentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
    pub confidence: f32,
}

impl VoiceIntent {
    pub fn ui_control(action: &str) -> Self {
        Self {
            kind: IntentKind::UiControl,
            action: Some(action.to_string()),
            game: None,
            confidence: UI_CONTROL_CONFIDENCE,
        }
    }

    pub fn game_start(game: &str, with_action_word: bool) -> Self {
        Self {
            kind: IntentKind::GameStart,
            action: Some(format!("START_GAME_{}", game.to_uppercase())),
            game: Some(game.to_string()),
            confidence: if with_action_word {
                GAME_WITH_ACTION_CONFIDENCE
            } else {
                GAME_KEYWORD_CONFIDENCE
            },
        }
    }

    pub fn info_request() -> Self {
        Self {
            kind: IntentKind::InfoRequest,
            action: None,
            game: None,
            confidence: INFO_REQUEST_CONFIDENCE,
        }
    }

    pub fn general_chat() -> Self {
        Self {
            kind: IntentKind::GeneralChat,
            action: None,
            game: None,
            confidence: GENERAL_CHAT_CONFIDENCE,
        }
    }
}
