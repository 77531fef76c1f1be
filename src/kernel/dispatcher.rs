use super::history::ChatHistory;
use super::intent::{CommandPatternTable, IntentKind, VoiceIntent, DEFAULT_TABLE};
use crate::protocol::OutboundMessage;
use crate::services::ChatRequest;

pub const DEFAULT_ACKNOWLEDGEMENT: &str = "네, 알겠어요.";
pub const APOLOGY: &str = "죄송해요, 잠시 문제가 생겼어요. 다시 말씀해 주시겠어요?";

static ACKNOWLEDGEMENTS: &[(&str, &str)] = &[
    ("SHOW_RANKING", "랭킹을 보여드릴게요."),
    ("SHOW_DASHBOARD", "기록을 보여드릴게요."),
    ("CLOSE_GAME", "게임을 종료할게요."),
    ("GO_HOME", "처음 화면으로 갈게요."),
    ("GO_BACK", "이전 화면으로 돌아갈게요."),
    ("VOLUME_UP", "소리를 키울게요."),
    ("VOLUME_DOWN", "소리를 줄일게요."),
    ("SHOW_HELP", "사용법을 알려드릴게요."),
];

pub fn acknowledgement_for(action: &str) -> &'static str {
    ACKNOWLEDGEMENTS
        .iter()
        .find(|(a, _)| *a == action)
        .map(|(_, ack)| *ack)
        .unwrap_or(DEFAULT_ACKNOWLEDGEMENT)
}

/// What the reactor must do for one classified transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchPlan {
    /// Tell the host page, then confirm aloud.
    Command {
        message: OutboundMessage,
        speech: String,
    },
    /// Ask the chat backend and speak whatever it answers.
    Converse { request: ChatRequest },
}

/// Pure projection: intent + context -> plan. Exactly one branch per intent kind.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    table: &'static CommandPatternTable,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(&DEFAULT_TABLE)
    }
}

impl Dispatcher {
    pub fn new(table: &'static CommandPatternTable) -> Self {
        Self { table }
    }

    pub fn plan(
        &self,
        intent: &VoiceIntent,
        transcript: &str,
        history: &ChatHistory,
        timestamp: i64,
    ) -> DispatchPlan {
        match (intent.kind, intent.action.as_deref()) {
            (IntentKind::GameStart, Some(action)) => {
                let game = intent.game.as_deref();
                DispatchPlan::Command {
                    message: OutboundMessage::voice_command(action, game, timestamp),
                    speech: self.game_confirmation(game.unwrap_or_default()),
                }
            }
            (IntentKind::UiControl, Some(action)) => DispatchPlan::Command {
                message: OutboundMessage::voice_command(action, None, timestamp),
                speech: acknowledgement_for(action).to_string(),
            },
            // A command intent without an action cannot be routed to the host.
            _ => DispatchPlan::Converse {
                request: ChatRequest::Message {
                    message: transcript.to_string(),
                    history: history.snapshot(),
                },
            },
        }
    }

    pub fn game_confirmation(&self, game: &str) -> String {
        let name = self
            .table
            .game(game)
            .map(|g| g.display_name)
            .unwrap_or(game);
        format!("{} 게임을 시작할게요!", name)
    }
}
