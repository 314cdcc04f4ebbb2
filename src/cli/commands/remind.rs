//! Reminder command handler

use chrono::NaiveDate;

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_remind(config: Config, date: Option<NaiveDate>) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    let report = match date {
        Some(today) => state.reminders.run_pass(today).await?,
        None => state.reminders.run_now().await?,
    };

    if let (Some(start), Some(end)) = (report.window_start, report.window_end) {
        println!("Reminder window: {start} .. {end}");
    }
    println!("Notified: {}", report.notified.len());

    if report.is_clean() {
        return Ok(());
    }

    println!("Failed:   {} (sponsor ids {:?})", report.failed.len(), report.failed);
    anyhow::bail!("{} reminder(s) could not be delivered", report.failed.len())
}
