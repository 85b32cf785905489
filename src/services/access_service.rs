//! Admin elevation through one-time tokens.

use sea_orm::{DatabaseConnection, DbErr};
use tracing::info;
use uuid::Uuid;

use crate::db::services::subscriber_service;
use crate::error::ServiceError;

#[derive(Clone)]
pub struct AccessController {
    db: DatabaseConnection,
}

impl AccessController {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// An unknown chat is never an admin.
    pub async fn is_admin(&self, chat_ref: &str) -> Result<bool, DbErr> {
        Ok(subscriber_service::get_subscriber(&self.db, chat_ref)
            .await?
            .is_some_and(|s| s.is_admin))
    }

    /// Gate for admin-only operations. Must run before any mutation or side effect.
    pub async fn require_admin(&self, chat_ref: &str) -> Result<(), ServiceError> {
        if self.is_admin(chat_ref).await? {
            Ok(())
        } else {
            info!(chat_ref, "Rejected admin-only command.");
            Err(ServiceError::Permission)
        }
    }

    /// Issues a fresh token for `chat_ref`, replacing any previous one.
    /// The token alone grants nothing until passed to [`Self::elevate`].
    pub async fn generate_token(&self, chat_ref: &str) -> Result<String, DbErr> {
        let token = Uuid::new_v4().to_string();
        subscriber_service::store_token(&self.db, chat_ref, &token).await?;
        info!(chat_ref, "Generated elevation token.");
        Ok(token)
    }

    /// Grants admin when `token` is the one currently stored for this very chat.
    /// The token stays valid afterwards.
    pub async fn elevate(&self, chat_ref: &str, token: &str) -> Result<bool, DbErr> {
        let granted =
            subscriber_service::grant_admin_if_token_matches(&self.db, chat_ref, token).await?;
        if granted {
            info!(chat_ref, "Chat elevated to admin.");
        }
        Ok(granted)
    }
}
