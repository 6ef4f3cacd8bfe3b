use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};

/// Delivers a finished digest message to the group channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, message: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct PokeMessageRequest<'a> {
    message: &'a str,
    chat_id: &'a str,
}

/// Posts digests to the Poke messages API.
pub struct PokeNotifier {
    client: Client,
    api_url: String,
    api_key: String,
    chat_id: String,
}

impl PokeNotifier {
    pub fn new(api_url: String, api_key: String, chat_id: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for PokeNotifier {
    async fn deliver(&self, message: &str) -> Result<()> {
        let request = PokeMessageRequest {
            message,
            chat_id: &self.chat_id,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Delivery(format!("Poke API error {}: {}", status, error_text)));
        }

        tracing::info!(chat_id = %self.chat_id, "Delivered digest to Poke");
        Ok(())
    }
}

/// Used when no Poke key is configured: logs the message and reports success.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, message: &str) -> Result<()> {
        let preview: String = message.chars().take(100).collect();
        tracing::info!(preview = %preview, "No Poke API key configured, digest logged only");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        tokio_test::assert_ok!(LogNotifier.deliver("hello group").await);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_delivery_failure() {
        let notifier = PokeNotifier::new(
            "http://127.0.0.1:9/v1/messages".to_string(),
            "key".to_string(),
            "default_group".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = notifier.deliver("hello").await.unwrap_err();
        assert!(matches!(err, AppError::Delivery(_)));
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(PokeMessageRequest {
            message: "hi",
            chat_id: "default_group",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"message": "hi", "chat_id": "default_group"}));
    }
}
