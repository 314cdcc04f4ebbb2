//! Upcoming-sponsor reminder pass.

use chrono::{Days, Local, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::notification::Notifier;
use crate::db::{Store, StoreResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
    /// Sponsor ids that were emailed successfully.
    pub notified: Vec<i32>,
    /// Sponsor ids whose reminder could not be delivered.
    pub failed: Vec<i32>,
}

impl ReminderReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ReminderService {
    store: Store,
    notifier: Arc<Notifier>,
    window_days: u32,
}

impl ReminderService {
    #[must_use]
    pub const fn new(store: Store, notifier: Arc<Notifier>, window_days: u32) -> Self {
        Self {
            store,
            notifier,
            window_days,
        }
    }

    /// Runs a pass anchored on the local calendar date.
    pub async fn run_now(&self) -> StoreResult<ReminderReport> {
        self.run_pass(Local::now().date_naive()).await
    }

    /// Emails a reminder for every sponsor dated `today..=today + window`.
    /// A delivery failure for one sponsor is logged and recorded; the rest
    /// are still attempted.
    pub async fn run_pass(&self, today: NaiveDate) -> StoreResult<ReminderReport> {
        let window_end = today
            .checked_add_days(Days::new(u64::from(self.window_days)))
            .unwrap_or(NaiveDate::MAX);

        let sponsors = self.store.get_sponsors_in_range(today, window_end).await?;

        let mut report = ReminderReport {
            window_start: Some(today),
            window_end: Some(window_end),
            ..ReminderReport::default()
        };

        for sponsor in &sponsors {
            match self.notifier.notify_upcoming_sponsor(sponsor).await {
                Ok(()) => report.notified.push(sponsor.id),
                Err(e) => {
                    warn!(
                        sponsor_id = sponsor.id,
                        error = %e,
                        "Reminder failed; continuing with remaining sponsors"
                    );
                    report.failed.push(sponsor.id);
                }
            }
        }

        info!(
            event = "reminder_pass_finished",
            %today,
            %window_end,
            notified = report.notified.len(),
            failed = report.failed.len(),
            "Reminder pass finished"
        );

        Ok(report)
    }
}
