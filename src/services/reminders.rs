// src/services/reminders.rs

use crate::{
    errors::{AppError, AppResult},
    models::{AlokaPuja, ReminderSummary},
    services::{email::preferred_contact, notifications::puja_reminder},
    state::AppState,
};
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

/// Bookings with a puja date in `[now, now + days]`.
pub async fn upcoming_pujas(
    state: &AppState,
    days: i64,
    now: DateTime<Utc>,
) -> AppResult<Vec<AlokaPuja>> {
    if !(0..=365).contains(&days) {
        return Err(AppError::Validation(
            "days must be between 0 and 365".to_string(),
        ));
    }
    state
        .store
        .list_pujas(None, Some(now), Some(now + Duration::days(days)))
        .await
}

async fn remind(state: &AppState, puja: &AlokaPuja) -> AppResult<()> {
    let donor = state
        .store
        .find_donor(puja.donor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Donor {} not found", puja.donor_id)))?;
    let user = match donor.user_id {
        Some(user_id) => state.store.find_user(user_id).await?,
        None => None,
    };

    let contact = preferred_contact(user.as_ref(), Some(&donor));
    let message = puja_reminder(&state.config.organization, &donor, puja);
    state
        .notifier
        .send(&contact, &message)
        .await
        .map_err(|e| AppError::Email(e.to_string()))?;

    state.store.mark_puja_notified(puja.id, Utc::now()).await
}

/// Reminds donors whose puja falls on the UTC day `days_ahead` after `now`.
/// Each booking is reminded once; failures are counted and retried on the
/// next run for the same day.
pub async fn send_puja_reminders(
    state: &AppState,
    days_ahead: i64,
    now: DateTime<Utc>,
) -> AppResult<ReminderSummary> {
    let day_start = (now.date_naive() + Duration::days(days_ahead))
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::Internal("Invalid reminder date".to_string()))?
        .and_utc();
    let day_end = day_start + Duration::days(1);

    let pujas = state
        .store
        .pujas_awaiting_reminder(day_start, day_end)
        .await?;

    let mut summary = ReminderSummary {
        days_ahead,
        total: pujas.len() as u32,
        sent: 0,
        errors: 0,
    };

    for puja in &pujas {
        match remind(state, puja).await {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                error!("Failed to send reminder for puja {}: {}", puja.id, e);
                summary.errors += 1;
            }
        }
    }

    info!(
        "Puja reminders for {}: {} of {} sent, {} errors",
        day_start.format("%Y-%m-%d"),
        summary.sent,
        summary.total,
        summary.errors
    );
    Ok(summary)
}
