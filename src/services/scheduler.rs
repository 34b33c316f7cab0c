//! Periodic jobs: the daily Aloka Puja reminders and the January run that
//! issues the previous year's tax receipts.

use crate::{
    services::{
        receipts::{ReconcileScope, reconcile_year},
        reminders::send_puja_reminders,
    },
    state::AppState,
};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info};

const TICK: Duration = Duration::from_secs(60);
const RECEIPT_MONTH: u32 = 1;
const RECEIPT_DAY: u32 = 15;
const RECEIPT_HOUR: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    PujaReminders,
    YearEndReceipts { year: i32 },
}

/// Decides which jobs are due. Each job fires at most once per UTC day.
#[derive(Debug)]
pub struct Schedule {
    reminder_hour: u32,
    reminders_ran: Option<NaiveDate>,
    receipts_ran: Option<NaiveDate>,
}

impl Schedule {
    pub fn new(reminder_hour: u32) -> Self {
        Self {
            reminder_hour,
            reminders_ran: None,
            receipts_ran: None,
        }
    }

    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<Job> {
        let today = now.date_naive();
        let mut jobs = Vec::new();

        if now.hour() == self.reminder_hour && self.reminders_ran != Some(today) {
            self.reminders_ran = Some(today);
            jobs.push(Job::PujaReminders);
        }

        if now.month() == RECEIPT_MONTH
            && now.day() == RECEIPT_DAY
            && now.hour() == RECEIPT_HOUR
            && self.receipts_ran != Some(today)
        {
            self.receipts_ran = Some(today);
            jobs.push(Job::YearEndReceipts {
                year: now.year() - 1,
            });
        }

        jobs
    }
}

async fn run_job(state: &AppState, job: Job) {
    match job {
        Job::PujaReminders => {
            let days_ahead = state.config.reminder_days_ahead;
            if let Err(e) = send_puja_reminders(state, days_ahead, Utc::now()).await {
                error!("Scheduled puja reminders failed: {}", e);
            }
        }
        Job::YearEndReceipts { year } => {
            match reconcile_year(state, year, ReconcileScope::AllDonors).await {
                Ok(summary) => info!(
                    "Scheduled {} receipts: created={} skipped={} errors={}",
                    year, summary.created, summary.skipped, summary.errors
                ),
                Err(e) => error!("Scheduled {} receipt run failed: {}", year, e),
            }
        }
    }
}

/// Starts the scheduler loop on the runtime. Send `true` on `shutdown` to
/// stop it.
pub fn start(state: AppState, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut schedule = Schedule::new(state.config.reminder_hour_utc);
        let mut ticker = tokio::time::interval(TICK);
        info!(
            "Scheduler started: reminders daily at {:02}:00 UTC, receipts on Jan {} at {:02}:00 UTC",
            state.config.reminder_hour_utc, RECEIPT_DAY, RECEIPT_HOUR
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for job in schedule.due(Utc::now()) {
                        info!("Running scheduled job {:?}", job);
                        run_job(&state, job).await;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Scheduler stopped");
    })
}
