use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::{ChatRequest, ChatResponse};
use crate::error::ServiceError;

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send one request and return the trimmed textual reply.
    async fn send(&self, request: &ChatRequest) -> Result<String, ServiceError>;
}

#[derive(Clone)]
pub struct HttpChatClient {
    client: Client,
    base_url: String,
}

impl HttpChatClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatService for HttpChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Status(response.status().as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        let reply = body.reply.trim();
        if reply.is_empty() {
            return Err(ServiceError::EmptyReply);
        }
        debug!(chars = reply.chars().count(), "chat reply received");
        Ok(reply.to_string())
    }
}
