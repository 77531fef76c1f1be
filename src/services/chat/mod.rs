pub mod client;
pub mod types;

pub use client::{ChatService, HttpChatClient};
pub use types::{ChatRequest, ChatResponse, PromptRequest};
