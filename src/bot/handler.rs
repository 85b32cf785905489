//! Command dispatch. This is the only place where errors are turned into
//! user-facing text.

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::command::{is_admin_only, Command, HELP_TEXT};
use crate::db::entities::monitored_app;
use crate::db::enums::AppStatus;
use crate::db::services::{app_service, subscriber_service, NewApp, SubscribeOutcome};
use crate::error::ServiceError;
use crate::monitor::{HealthScheduler, Prober};
use crate::notifications::{BroadcastReport, MessageTransport, Notifier};
use crate::services::AccessController;

/// One line of `/status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppStatusView {
    pub name: String,
    pub status: AppStatus,
    pub url: String,
}

/// One entry of `/getlaunchlinks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchLinkView {
    pub name: String,
    pub launch_link: String,
}

pub struct CommandHandler {
    db: DatabaseConnection,
    access: AccessController,
    scheduler: Arc<HealthScheduler>,
    notifier: Arc<Notifier>,
}

impl CommandHandler {
    pub fn new(
        db: DatabaseConnection,
        access: AccessController,
        scheduler: Arc<HealthScheduler>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            db,
            access,
            scheduler,
            notifier,
        }
    }

    /// Wires the access controller, notifier and scheduler around one registry
    /// connection. The scheduler's timer is not started.
    pub fn from_parts(
        db: DatabaseConnection,
        prober: Arc<dyn Prober>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let notifier = Arc::new(Notifier::new(db.clone(), transport));
        let scheduler = Arc::new(HealthScheduler::new(db.clone(), prober, notifier.clone()));
        Self::new(db.clone(), AccessController::new(db), scheduler, notifier)
    }

    pub fn scheduler(&self) -> &Arc<HealthScheduler> {
        &self.scheduler
    }

    /// Handles one chat message and returns the reply text.
    pub async fn handle(&self, chat_ref: &str, text: &str) -> String {
        // Well-formed admin commands are gated inside the typed operations.
        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(e) => {
                // A non-admin gets the permission reply, never a usage hint.
                if is_admin_only(text) {
                    if let Err(denied) = self.access.require_admin(chat_ref).await {
                        return render_error(denied);
                    }
                }
                return render_error(e);
            }
        };

        match self.execute(chat_ref, command).await {
            Ok(reply) => reply,
            Err(e) => render_error(e),
        }
    }

    async fn execute(&self, chat_ref: &str, command: Command) -> Result<String, ServiceError> {
        match command {
            Command::Start { token } => {
                if self.start(chat_ref, token.as_deref()).await? {
                    Ok("Bot started with administrator rights.".to_string())
                } else {
                    Ok("Bot started. Send /help for the command list.".to_string())
                }
            }
            Command::Subscribe => match self.subscribe(chat_ref).await? {
                SubscribeOutcome::Subscribed => Ok("You are now subscribed to notifications.".to_string()),
                SubscribeOutcome::AlreadySubscribed => Ok("You are already subscribed.".to_string()),
            },
            Command::GenerateKey => self.generate_key(chat_ref).await,
            Command::Status => {
                let apps = self.status().await?;
                if apps.is_empty() {
                    return Ok("No applications registered.".to_string());
                }
                Ok(apps
                    .iter()
                    .map(|app| format!("Application: {}, status: {}\n{}", app.name, app.status, app.url))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::GetLaunchLinks => {
                let links = self.launch_links().await?;
                if links.is_empty() {
                    return Ok("No applications registered.".to_string());
                }
                Ok(links
                    .iter()
                    .map(|l| format!("{}: {}", l.name, l.launch_link))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::Add {
                url,
                name,
                launch_link,
            } => {
                let app = self.add(chat_ref, &url, &name, &launch_link).await?;
                Ok(format!("Application {} added.", app.name))
            }
            Command::Remove { name } => {
                self.remove(chat_ref, &name).await?;
                Ok(format!("Application {name} removed."))
            }
            Command::Broadcast { text } => {
                let report = self.broadcast(chat_ref, &text).await?;
                Ok(format!(
                    "Message sent to {} subscriber(s), {} failed.",
                    report.delivered, report.failed
                ))
            }
            Command::SetInterval { seconds } => {
                let period = self.set_interval(chat_ref, seconds).await?;
                Ok(format!("Check interval set to {} seconds.", period.as_secs()))
            }
            Command::Help => Ok(HELP_TEXT.to_string()),
        }
    }

    /// Elevates when a matching token is supplied. Returns whether the chat is
    /// now an admin through this call.
    pub async fn start(&self, chat_ref: &str, token: Option<&str>) -> Result<bool, ServiceError> {
        match token {
            Some(token) if !token.is_empty() => Ok(self.access.elevate(chat_ref, token).await?),
            _ => Ok(false),
        }
    }

    pub async fn subscribe(&self, chat_ref: &str) -> Result<SubscribeOutcome, ServiceError> {
        let outcome = subscriber_service::subscribe(&self.db, chat_ref).await?;
        if outcome == SubscribeOutcome::Subscribed {
            info!(chat_ref, "New subscriber.");
        }
        Ok(outcome)
    }

    pub async fn generate_key(&self, chat_ref: &str) -> Result<String, ServiceError> {
        Ok(self.access.generate_token(chat_ref).await?)
    }

    pub async fn status(&self) -> Result<Vec<AppStatusView>, ServiceError> {
        let apps = app_service::list_apps(&self.db).await?;
        Ok(apps
            .into_iter()
            .map(|app| AppStatusView {
                name: app.name,
                status: app.status,
                url: app.url,
            })
            .collect())
    }

    pub async fn launch_links(&self) -> Result<Vec<LaunchLinkView>, ServiceError> {
        let apps = app_service::list_apps(&self.db).await?;
        Ok(apps
            .into_iter()
            .map(|app| LaunchLinkView {
                name: app.name,
                launch_link: app.launch_link,
            })
            .collect())
    }

    pub async fn add(
        &self,
        chat_ref: &str,
        url: &str,
        name: &str,
        launch_link: &str,
    ) -> Result<monitored_app::Model, ServiceError> {
        self.access.require_admin(chat_ref).await?;
        let app = app_service::create_app(
            &self.db,
            NewApp {
                url: url.to_string(),
                name: name.to_string(),
                launch_link: launch_link.to_string(),
            },
        )
        .await?;
        info!(name = %app.name, url = %app.url, launch_link = %app.launch_link, "Application added.");
        Ok(app)
    }

    pub async fn remove(&self, chat_ref: &str, name: &str) -> Result<(), ServiceError> {
        self.access.require_admin(chat_ref).await?;
        if !app_service::delete_app_by_name(&self.db, name).await? {
            return Err(ServiceError::NotFound(format!("application {name}")));
        }
        info!(name, "Application removed.");
        Ok(())
    }

    pub async fn broadcast(&self, chat_ref: &str, text: &str) -> Result<BroadcastReport, ServiceError> {
        self.access.require_admin(chat_ref).await?;
        if text.trim().is_empty() {
            return Err(ServiceError::Validation("Broadcast text must not be empty.".to_string()));
        }
        Ok(self.notifier.broadcast(text).await)
    }

    pub async fn set_interval(&self, chat_ref: &str, seconds: u64) -> Result<Duration, ServiceError> {
        self.access.require_admin(chat_ref).await?;
        self.scheduler.reschedule(seconds).await
    }
}

fn render_error(err: ServiceError) -> String {
    if let ServiceError::Database(ref e) = err {
        error!(error = %e, "Command failed with a storage error.");
    }
    err.user_message()
}
