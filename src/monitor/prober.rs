//! Single-shot reachability checks.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use super::state::ProbeOutcome;

/// Why a probe counted as a failure. Only ever logged.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

#[async_trait]
pub trait Prober: Send + Sync {
    /// Never fails: every failure mode collapses to `Unreachable`.
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Probes with a plain `GET`; only `200 OK` counts as reachable.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub async fn check(&self, url: &str) -> Result<(), ProbeError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Transport(e)
            }
        })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            other => Err(ProbeError::UnexpectedStatus(other)),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start_time = Instant::now();
        match self.check(url).await {
            Ok(()) => {
                debug!(url, elapsed_ms = start_time.elapsed().as_millis() as u64, "Probe succeeded.");
                ProbeOutcome::Reachable
            }
            Err(e) => {
                warn!(url, error = %e, "Probe failed.");
                ProbeOutcome::Unreachable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};
    use tokio::net::TcpListener;

    async fn spawn_server() -> String {
        let app = Router::new()
            .route("/ok", get(|| async { "up" }))
            .route("/created", get(|| async { (AxumStatus::CREATED, "created") }))
            .route("/broken", get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "down") }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "late"
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_only_200_is_reachable() {
        let base = spawn_server().await;
        let prober = HttpProber::new(Duration::from_millis(500)).unwrap();

        assert_eq!(prober.probe(&format!("{base}/ok")).await, ProbeOutcome::Reachable);
        assert_eq!(prober.probe(&format!("{base}/created")).await, ProbeOutcome::Unreachable);
        assert_eq!(prober.probe(&format!("{base}/broken")).await, ProbeOutcome::Unreachable);
        assert_eq!(prober.probe(&format!("{base}/missing")).await, ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_timeout_is_unreachable() {
        let base = spawn_server().await;
        let prober = HttpProber::new(Duration::from_millis(200)).unwrap();

        let err = prober.check(&format!("{base}/slow")).await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout), "got {err:?}");
        assert_eq!(prober.probe(&format!("{base}/slow")).await, ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = HttpProber::new(Duration::from_millis(500)).unwrap();
        let err = prober.check(&format!("http://{addr}/")).await.unwrap_err();
        assert!(matches!(err, ProbeError::Transport(_)), "got {err:?}");
    }
}
