use futures::stream::{self, StreamExt};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::transport::MessageTransport;
use crate::db::services::subscriber_service;

/// Upper bound on deliveries in flight during one broadcast.
const FANOUT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans a message out to every subscriber.
pub struct Notifier {
    db: DatabaseConnection,
    transport: Arc<dyn MessageTransport>,
}

impl Notifier {
    pub fn new(db: DatabaseConnection, transport: Arc<dyn MessageTransport>) -> Self {
        Self { db, transport }
    }

    /// Sends `message` to the subscriber set as it is right now.
    ///
    /// Individual delivery failures are logged and counted; they never stop
    /// delivery to the remaining recipients and nothing is retried.
    pub async fn broadcast(&self, message: &str) -> BroadcastReport {
        info!(message, "Broadcasting message to all subscribers.");

        let subscribers = match subscriber_service::list_subscribers(&self.db).await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                error!(error = %e, "Failed to load subscribers; nothing was sent.");
                return BroadcastReport::default();
            }
        };

        let results: Vec<bool> = stream::iter(subscribers)
            .map(|subscriber| async move {
                match self.transport.send_message(&subscriber.chat_ref, message).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(chat_ref = %subscriber.chat_ref, error = %e, "Delivery failed.");
                        false
                    }
                }
            })
            .buffer_unordered(FANOUT_CONCURRENCY)
            .collect()
            .await;

        let delivered = results.iter().filter(|ok| **ok).count();
        let report = BroadcastReport {
            delivered,
            failed: results.len() - delivered,
        };
        info!(delivered = report.delivered, failed = report.failed, "Broadcast finished.");
        report
    }
}
