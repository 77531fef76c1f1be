use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ServiceError;

#[async_trait]
pub trait TokenService: Send + Sync {
    async fn fetch_token(&self) -> Result<String, ServiceError>;
}

/// `POST /api/get-access-token`, plain-text bearer token in the body.
#[derive(Clone)]
pub struct HttpTokenClient {
    client: Client,
    base_url: String,
}

impl HttpTokenClient {
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
impl TokenService for HttpTokenClient {
    async fn fetch_token(&self) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(format!("{}/api/get-access-token", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Status(response.status().as_u16()));
        }

        let token = response.text().await?;
        let token = token.trim();
        if token.is_empty() {
            return Err(ServiceError::EmptyToken);
        }
        Ok(token.to_string())
    }
}
