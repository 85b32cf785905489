//! Timer-driven monitoring cycles.
//!
//! A [`HealthScheduler`] owns one restartable repeating timer. Every tick
//! spawns a cycle that probes all registered applications in `id` order,
//! applies the retry state machine and notifies subscribers when an
//! application goes down. At most one cycle runs at a time.

use chrono::Utc;
use sea_orm::{DatabaseConnection, DbErr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::prober::Prober;
use crate::db::services::app_service;
use crate::error::ServiceError;
use crate::notifications::Notifier;

pub const MIN_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_INTERVAL_SECS: u64 = 900;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub went_down: Vec<String>,
    pub recovered: Vec<String>,
}

#[derive(Debug)]
pub enum TickOutcome {
    Completed(CycleReport),
    /// Another cycle was still running.
    Skipped,
    Failed,
}

pub fn unavailable_message(app_name: &str) -> String {
    format!("Application {app_name} is unavailable.")
}

struct CycleRunner {
    db: DatabaseConnection,
    prober: Arc<dyn Prober>,
    notifier: Arc<Notifier>,
    cycle_lock: Mutex<()>,
    ticks: AtomicU64,
}

impl CycleRunner {
    /// Waits for a running cycle to finish, then runs one.
    async fn run_cycle(&self) -> Result<CycleReport, DbErr> {
        let _guard = self.cycle_lock.lock().await;
        self.run_locked().await
    }

    /// Timer entry point: drops the tick instead of queueing behind a running cycle.
    async fn tick(&self) -> TickOutcome {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!("Previous monitoring cycle is still running; skipping this tick.");
            return TickOutcome::Skipped;
        };

        match self.run_locked().await {
            Ok(report) => TickOutcome::Completed(report),
            Err(e) => {
                error!(error = %e, "Monitoring cycle aborted by a storage error; retrying on next tick.");
                TickOutcome::Failed
            }
        }
    }

    async fn run_locked(&self) -> Result<CycleReport, DbErr> {
        let apps = app_service::list_apps(&self.db).await?;
        info!(count = apps.len(), "Starting monitoring cycle.");

        let mut report = CycleReport::default();
        for app in apps {
            let outcome = self.prober.probe(&app.url).await;

            let Some((updated, transition)) =
                app_service::record_probe_outcome(&self.db, app.id, outcome, Utc::now()).await?
            else {
                debug!(app = %app.name, "Application was removed during the cycle; skipping.");
                continue;
            };
            report.checked += 1;

            if transition.went_down {
                warn!(app = %updated.name, retries = updated.retry_count, "Application is unavailable.");
                self.notifier
                    .broadcast(&unavailable_message(&updated.name))
                    .await;
                report.went_down.push(updated.name);
            } else if transition.recovered {
                info!(app = %updated.name, "Application is available again.");
                report.recovered.push(updated.name);
            }
        }

        info!(
            checked = report.checked,
            went_down = report.went_down.len(),
            recovered = report.recovered.len(),
            "Monitoring cycle finished."
        );
        Ok(report)
    }
}

pub struct HealthScheduler {
    runner: Arc<CycleRunner>,
    timer: Mutex<Option<JoinHandle<()>>>,
    interval_secs: AtomicU64,
}

impl HealthScheduler {
    /// Creates a scheduler with no timer installed; call [`Self::reschedule`] to start it.
    pub fn new(db: DatabaseConnection, prober: Arc<dyn Prober>, notifier: Arc<Notifier>) -> Self {
        Self {
            runner: Arc::new(CycleRunner {
                db,
                prober,
                notifier,
                cycle_lock: Mutex::new(()),
                ticks: AtomicU64::new(0),
            }),
            timer: Mutex::new(None),
            interval_secs: AtomicU64::new(DEFAULT_INTERVAL_SECS),
        }
    }

    /// Replaces the repeating timer with one firing every `seconds`.
    ///
    /// A cycle that is already running is not interrupted.
    pub async fn reschedule(&self, seconds: u64) -> Result<Duration, ServiceError> {
        if seconds < MIN_INTERVAL_SECS {
            return Err(ServiceError::Validation(format!(
                "Interval must be at least {MIN_INTERVAL_SECS} seconds."
            )));
        }
        let period = Duration::from_secs(seconds);
        self.install_timer(period).await;
        info!(interval_seconds = seconds, "Monitoring interval set.");
        Ok(period)
    }

    /// Cancel-then-install under one lock so two concurrent reschedules never
    /// leave two timers behind.
    async fn install_timer(&self, period: Duration) {
        let mut timer = self.timer.lock().await;
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        *timer = Some(spawn_timer(self.runner.clone(), period));
        self.interval_secs.store(period.as_secs(), Ordering::Relaxed);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.load(Ordering::Relaxed))
    }

    /// Number of timer ticks fired since creation, skipped ones included.
    pub fn ticks_fired(&self) -> u64 {
        self.runner.ticks.load(Ordering::Relaxed)
    }

    /// Cancels the timer. In-flight cycles run to completion.
    pub async fn stop(&self) {
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
            info!("Monitoring timer stopped.");
        }
    }

    /// Runs one cycle now, waiting for any cycle already in progress.
    pub async fn run_cycle(&self) -> Result<CycleReport, DbErr> {
        self.runner.run_cycle().await
    }
}

impl Drop for HealthScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}

fn spawn_timer(runner: Arc<CycleRunner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let tick = runner.ticks.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(tick, "Monitoring timer fired.");
            // Cycles get their own task so aborting the timer never cuts one short.
            let runner = runner.clone();
            tokio::spawn(async move {
                runner.tick().await;
            });
        }
    })
}
