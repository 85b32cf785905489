//! Shared fixtures for unit tests: a throwaway SQLite registry and
//! in-memory doubles for the prober and the chat transport.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tempfile::TempDir;

use crate::monitor::{ProbeOutcome, Prober};
use crate::notifications::{MessageTransport, SenderError};

/// Fresh registry in a temporary directory. Keep the `TempDir` alive for the
/// duration of the test.
pub async fn test_db() -> (DatabaseConnection, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("registry.sqlite").display());
    let db = crate::db::connect(&url).await.unwrap();
    (db, dir)
}

/// Returns a per-URL outcome (default `Reachable`) and records every call.
#[derive(Default)]
pub struct ScriptedProber {
    outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub fn set(&self, url: &str, outcome: ProbeOutcome) {
        self.outcomes.lock().unwrap().insert(url.to_string(), outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.calls.lock().unwrap().push(url.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(ProbeOutcome::Reachable)
    }
}

/// Records successful deliveries; fails for the configured chats.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    pub fn failing_for<'a>(chats: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: chats.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients_of(&self, text: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, t)| t == text)
            .map(|(chat, _)| chat.clone())
            .collect()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send_message(&self, chat_ref: &str, text: &str) -> Result<(), SenderError> {
        if self.failing.contains(chat_ref) {
            return Err(SenderError::SendFailed(format!("chat {chat_ref} blocked the bot")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_ref.to_string(), text.to_string()));
        Ok(())
    }
}
