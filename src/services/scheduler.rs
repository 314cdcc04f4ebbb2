use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant, interval_at};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::ReminderConfig;
use crate::services::ReminderService;

pub struct Scheduler {
    reminders: Arc<ReminderService>,
    config: ReminderConfig,
    period: Duration,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(reminders: Arc<ReminderService>, config: ReminderConfig) -> Self {
        Self {
            reminders,
            period: interval_period(&config),
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Replaces the interval taken from `interval_hours`.
    #[must_use]
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Reminder scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting reminder scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let reminders = Arc::clone(&self.reminders);
        let running = Arc::clone(&self.running);

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let reminders = Arc::clone(&reminders);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_reminder_job(&reminders).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Reminder scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        info!(
            "Reminder scheduler running: every {}s",
            self.period.as_secs()
        );

        fire_every(self.period, &self.running, || {
            run_reminder_job(&self.reminders)
        })
        .await;

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

fn interval_period(config: &ReminderConfig) -> Duration {
    Duration::from_secs(u64::from(config.interval_hours.max(1)) * 60 * 60)
}

/// Calls `job` every `period` until `running` is cleared. The first call
/// comes one full period after startup.
async fn fire_every<F, Fut>(period: Duration, running: &RwLock<bool>, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        ticker.tick().await;
        if !*running.read().await {
            break;
        }
        job().await;
    }
}

/// One scheduled firing. Errors end here so the next firing is unaffected.
async fn run_reminder_job(reminders: &ReminderService) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "sponsor_reminders", "Starting scheduled reminder pass");

    match reminders.run_now().await {
        Ok(report) => {
            metrics::counter!("reminder_passes_total", "outcome" => "ok").increment(1);
            info!(
                event = "job_finished",
                job_name = "sponsor_reminders",
                notified = report.notified.len(),
                failed = report.failed.len(),
                duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                "Scheduled reminder pass finished"
            );
        }
        Err(e) => {
            metrics::counter!("reminder_passes_total", "outcome" => "error").increment(1);
            error!(event = "job_failed", job_name = "sponsor_reminders", error = %e, "Scheduled reminder pass failed");
        }
    }
}
