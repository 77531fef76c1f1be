pub mod avatar;
pub mod chat;
pub mod recognizer;
pub mod token;

pub use avatar::{AvatarClient, ConsoleAvatar, SessionId};
pub use chat::{ChatRequest, ChatService, HttpChatClient, PromptRequest};
pub use recognizer::{ConsoleRecognizer, Recognizer};
pub use token::{HttpTokenClient, TokenService};
