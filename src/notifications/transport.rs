use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Delivers a text message to one recipient on the chat transport.
///
/// Implemented by the Telegram client; the notifier only depends on this trait.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_message(&self, chat_ref: &str, text: &str) -> Result<(), SenderError>;
}
