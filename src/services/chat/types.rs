use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::kernel::history::ChatMessage;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatRequest {
    /// Free-form turn with the conversation so far.
    Message {
        message: String,
        history: Vec<ChatMessage>,
    },
    /// Canned prompt the backend expands server-side.
    Prompt(PromptRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptRequest {
    TabExplain {
        #[serde(rename = "tabId")]
        tab_id: String,
    },
    Greeting {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<Value>,
    },
    GameExplain {
        game: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    DashboardExplain {
        #[serde(flatten)]
        details: Map<String, Value>,
    },
}

impl From<PromptRequest> for ChatRequest {
    fn from(prompt: PromptRequest) -> Self {
        ChatRequest::Prompt(prompt)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}
