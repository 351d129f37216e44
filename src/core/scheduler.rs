//! Periodic and manual alert sweeps.
//!
//! At most one sweep runs at a time. A tick or manual trigger that finds a
//! sweep in progress is dropped, not queued; the next tick covers it, because
//! what is due comes from the record dates rather than from how often ticks fire.

use crate::{
    config::SchedulerConfig,
    core::generator::{AlertGenerator, SweepReport, format_sweep_summary},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Whether a sweep is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick or trigger
    Idle,
    /// A sweep is running
    Running,
}

/// Holds the running flag for the duration of one sweep.
struct RunningGuard(Arc<AtomicBool>);

impl RunningGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives [`AlertGenerator`] on an interval and on demand.
#[derive(Debug)]
pub struct AlertScheduler {
    generator: AlertGenerator,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl AlertScheduler {
    /// Creates a scheduler ticking every `interval`.
    #[must_use]
    pub fn new(generator: AlertGenerator, interval: Duration) -> Self {
        Self {
            generator,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a scheduler and its generator from the `[scheduler]` settings.
    #[must_use]
    pub fn from_config(db: DatabaseConnection, config: &SchedulerConfig) -> Self {
        Self::new(
            AlertGenerator::new(db, config.weekly_grace_days),
            config.interval(),
        )
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Asks the in-flight sweep, if any, to stop after its current record.
    ///
    /// Does nothing while idle, so it never cancels a later trigger.
    pub fn cancel(&self) {
        if self.state() == SchedulerState::Running {
            self.generator.cancel();
        }
    }

    /// Runs a sweep now unless one is already running.
    ///
    /// # Returns
    /// * `Ok(Some(report))` - The sweep ran
    /// * `Ok(None)` - Another sweep was running; this trigger was dropped
    pub async fn trigger_now(&self, now: DateTime<Utc>) -> Result<Option<SweepReport>> {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            warn!("Alert sweep already running, trigger dropped");
            return Ok(None);
        };
        self.generator.run_sweep(now).await.map(Some)
    }

    /// Ticks until `shutdown` resolves. The first tick fires immediately.
    ///
    /// A sweep in progress when `shutdown` resolves is cancelled after its
    /// current record and awaited.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);
        info!("Alert scheduler started, interval {:?}", self.interval);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    let sweep = self.trigger_now(Utc::now());
                    tokio::pin!(sweep);
                    tokio::select! {
                        biased;
                        result = &mut sweep => log_outcome(result),
                        () = &mut shutdown => {
                            self.cancel();
                            log_outcome(sweep.await);
                            break;
                        }
                    }
                }
            }
        }

        info!("Alert scheduler stopped");
    }
}

fn log_outcome(result: Result<Option<SweepReport>>) {
    match result {
        Ok(Some(report)) if report.records_failed > 0 => {
            warn!("{}", format_sweep_summary(&report));
        }
        Ok(_) => {}
        Err(e) => error!("Alert sweep failed, retrying next tick: {e}"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::generator::last_sweep_at;
    use crate::test_utils::*;
    use sea_orm::ConnectionTrait;

    #[tokio::test]
    async fn test_trigger_now_runs_sweep() -> Result<()> {
        let db = setup_test_db().await?;
        let scheduler = AlertScheduler::from_config(db.clone(), &SchedulerConfig::default());

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        let report = scheduler.trigger_now(test_now()).await?;
        assert!(report.is_some());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(last_sweep_at(&db).await?, Some(test_now()));
        Ok(())
    }

    #[tokio::test]
    async fn test_trigger_dropped_while_running() -> Result<()> {
        let db = setup_test_db().await?;
        let scheduler = AlertScheduler::from_config(db.clone(), &SchedulerConfig::default());

        let guard = RunningGuard::acquire(&scheduler.running).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(RunningGuard::acquire(&scheduler.running).is_none());
        assert!(scheduler.trigger_now(test_now()).await?.is_none());
        assert!(last_sweep_at(&db).await?.is_none());

        drop(guard);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.trigger_now(test_now()).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_while_idle_is_ignored() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_pollination(&db, test_now()).await?;
        let scheduler = AlertScheduler::from_config(db.clone(), &SchedulerConfig::default());

        scheduler.cancel();
        let sweep_at = test_now().checked_add_days(chrono::Days::new(7)).unwrap();
        let report = scheduler.trigger_now(sweep_at).await?.unwrap();
        assert!(!report.cancelled);
        assert_eq!(report.alerts_created, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_while_running_stops_sweep() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_pollination(&db, test_now()).await?;
        let scheduler = AlertScheduler::from_config(db.clone(), &SchedulerConfig::default());
        let sweep_at = test_now().checked_add_days(chrono::Days::new(7)).unwrap();

        // Hold the flag as a running sweep would, then run that sweep directly
        let guard = RunningGuard::acquire(&scheduler.running).unwrap();
        scheduler.cancel();
        let report = scheduler.generator.run_sweep(sweep_at).await?;
        drop(guard);
        assert!(report.cancelled);
        assert_eq!(report.alerts_created, 0);
        assert!(last_sweep_at(&db).await?.is_none());

        let report = scheduler.trigger_now(sweep_at).await?.unwrap();
        assert!(!report.cancelled);
        assert_eq!(report.alerts_created, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_sweep_releases_running_flag() -> Result<()> {
        let db = setup_test_db().await?;
        db.execute_unprepared("DROP TABLE pollination_records").await?;
        let scheduler = AlertScheduler::from_config(db.clone(), &SchedulerConfig::default());

        assert!(scheduler.trigger_now(test_now()).await.is_err());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_until_catches_up_on_first_tick() -> Result<()> {
        let db = setup_test_db().await?;
        let scheduler = AlertScheduler::new(
            AlertGenerator::new(db.clone(), 7),
            Duration::from_secs(3600),
        );

        // The first tick is immediate even with an hourly interval
        scheduler
            .run_until(tokio::time::sleep(Duration::from_millis(200)))
            .await;

        assert!(last_sweep_at(&db).await?.is_some());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        Ok(())
    }
}
