use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{TelegramClient, Update};
use crate::bot::CommandHandler;
use crate::notifications::MessageTransport;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-polls Telegram and answers every text message through the command handler.
pub struct TelegramPoller {
    client: Arc<TelegramClient>,
    handler: Arc<CommandHandler>,
    poll_timeout: Duration,
}

impl TelegramPoller {
    pub fn new(client: Arc<TelegramClient>, handler: Arc<CommandHandler>, poll_timeout: Duration) -> Self {
        Self {
            client,
            handler,
            poll_timeout,
        }
    }

    /// Runs until the task is cancelled.
    pub async fn run(&self) {
        info!(poll_timeout_seconds = self.poll_timeout.as_secs(), "Telegram polling started.");
        let mut offset = 0i64;
        loop {
            let updates = match self.client.get_updates(offset, self.poll_timeout).await {
                Ok(updates) => updates,
                Err(e) => {
                    error!(error = %e, "Failed to fetch updates; retrying shortly.");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                dispatch_update(&self.handler, self.client.as_ref(), update).await;
            }
        }
    }
}

/// Handles one update and sends the reply back to the originating chat.
/// Returns whether a reply was delivered.
pub async fn dispatch_update(
    handler: &CommandHandler,
    transport: &dyn MessageTransport,
    update: Update,
) -> bool {
    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "Ignoring update without a message.");
        return false;
    };
    let Some(text) = message.text else {
        debug!(update_id = update.update_id, "Ignoring message without text.");
        return false;
    };

    let chat_ref = message.chat.id.to_string();
    let reply = handler.handle(&chat_ref, &text).await;
    match transport.send_message(&chat_ref, &reply).await {
        Ok(()) => true,
        Err(e) => {
            warn!(chat_ref = %chat_ref, error = %e, "Failed to deliver reply.");
            false
        }
    }
}
