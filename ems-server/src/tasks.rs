//! Background tasks
//!
//! - expiry sweeper: releases pending registrations whose reservation ran
//!   out
//! - rate limiter cleanup
//!
//! All tasks stop on the shared [`CancellationToken`] during shutdown.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use shared::models::RegistrationStatus;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::RateLimiter;
use crate::db;
use crate::error::ServiceResult;
use crate::services::fulfillment::release_reservation;
use crate::state::AppState;
use crate::util::now_millis;

/// Registrations released per sweep
const SWEEP_BATCH: i64 = 100;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

struct RegisteredTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Owns every spawned background task and the token that stops them.
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn a task. Panics are caught and logged instead of vanishing with
    /// the join handle.
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.clone();
        let wrapped = async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if token.is_cancelled() => {
                    tracing::debug!(task = %name, "Background task stopped");
                }
                Ok(()) => {
                    tracing::warn!(task = %name, "Background task completed unexpectedly");
                }
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    tracing::error!(task = %name, panic = %panic_msg, "Background task panicked");
                }
            }
        };

        let handle = tokio::spawn(wrapped);
        tracing::debug!(task = %name, "Registered background task");
        self.tasks.push(RegisteredTask { name, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn log_summary(&self) {
        let names: Vec<&str> = self.tasks.iter().map(|t| t.name).collect();
        tracing::info!(
            total = self.tasks.len(),
            tasks = ?names,
            "Background tasks registered"
        );
    }

    /// Cancel every task and wait for it to finish.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} background tasks...", self.tasks.len());
        self.shutdown.cancel();

        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task panicked"),
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the server's periodic jobs.
pub fn spawn_all(tasks: &mut BackgroundTasks, state: &AppState) {
    let sweeper_state = state.clone();
    let token = tasks.shutdown_token();
    let interval = Duration::from_secs(state.config.sweep_interval_secs.max(1));
    tasks.spawn("expiry_sweeper", async move {
        run_expiry_sweeper(sweeper_state, interval, token).await;
    });

    let limiter = state.rate_limiter.clone();
    let token = tasks.shutdown_token();
    tasks.spawn("rate_limit_cleanup", async move {
        run_rate_limit_cleanup(limiter, token).await;
    });

    tasks.log_summary();
}

async fn run_expiry_sweeper(state: AppState, every: Duration, token: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                match sweep_expired(&state).await {
                    Ok(0) => {}
                    Ok(released) => tracing::info!(released, "Expired reservations released"),
                    Err(e) => {
                        let e: shared::error::AppError = e.into();
                        tracing::error!(error = %e, "Expiry sweep failed");
                    }
                }
            }
        }
    }
}

/// Release every overdue pending registration. Each one runs in its own
/// transaction, so a webhook confirming the same registration concurrently
/// wins or loses cleanly.
pub async fn sweep_expired(state: &AppState) -> ServiceResult<usize> {
    let ids = db::registrations::find_expired_pending(&state.pool, now_millis(), SWEEP_BATCH).await?;
    let mut released = 0;

    for id in ids {
        let registration = match release_reservation(state, id, RegistrationStatus::Expired).await {
            Ok(Some(registration)) => registration,
            // Confirmed or cancelled meanwhile
            Ok(None) => continue,
            Err(e) => {
                let e: shared::error::AppError = e.into();
                tracing::error!(registration_id = id, error = %e, "Failed to expire registration");
                continue;
            }
        };
        released += 1;

        let type_name = db::ticket_types::find_by_id(&state.pool, registration.ticket_type_id)
            .await
            .ok()
            .flatten()
            .map(|t| t.name)
            .unwrap_or_default();
        if let Err(e) = state
            .email
            .send_reservation_expired(&registration, &type_name)
            .await
        {
            tracing::warn!(registration_id = id, error = %e, "Expiry email not sent");
        }
    }

    Ok(released)
}

async fn run_rate_limit_cleanup(limiter: RateLimiter, token: CancellationToken) {
    let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => limiter.cleanup().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_stops_cancellable_tasks() {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        tasks.spawn("idle", async move {
            token.cancelled().await;
        });
        assert_eq!(tasks.len(), 1);
        tasks.shutdown().await;
    }

    #[tokio::test]
    async fn panicking_task_does_not_poison_shutdown() {
        let mut tasks = BackgroundTasks::new();
        tasks.spawn("boom", async {
            panic!("boom");
        });
        tokio::task::yield_now().await;
        tasks.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_cleanup_exits_on_cancel() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_rate_limit_cleanup(RateLimiter::new(), token.clone()));
        tokio::time::advance(RATE_LIMIT_CLEANUP_INTERVAL * 2).await;
        token.cancel();
        handle.await.unwrap();
    }
}
