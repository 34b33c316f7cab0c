// src/services/donations.rs

use crate::{
    errors::{AppError, AppResult},
    models::{
        CreateDonationRequest, Donation, DonationCause, DonationChanges, DonationDecision,
        DonationStatus, Donor, NewDonation, UpdateDonationRequest, User,
    },
    services::{
        email::preferred_contact,
        notifications::{dispatch, donation_acknowledgment, donation_validated},
    },
    state::AppState,
    store::Store,
};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Who is recording the donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationOrigin {
    /// An approved donor through their account; staff confirm it later.
    Donor,
    /// The public walk-in form; recorded as already received.
    WalkIn,
}

/// Proof of payment uploaded with a validation.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn extension(&self) -> AppResult<&'static str> {
        if self.bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(AppError::Validation(
                "Attachment must be at most 5 MB".to_string(),
            ));
        }
        match self.content_type.as_str() {
            "image/png" => Ok("png"),
            "image/jpeg" | "image/jpg" => Ok("jpg"),
            "application/pdf" => Ok("pdf"),
            other => Err(AppError::Validation(format!(
                "Unsupported attachment type '{}'; use PNG, JPEG or PDF",
                other
            ))),
        }
    }
}

pub fn compute_net_amount(amount: Decimal, processor_fees: Option<Decimal>) -> Decimal {
    amount - processor_fees.unwrap_or(Decimal::ZERO)
}

fn check_amounts(amount: Decimal, processor_fees: Option<Decimal>) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if let Some(fees) = processor_fees {
        if fees < Decimal::ZERO {
            return Err(AppError::Validation(
                "Processor fees cannot be negative".to_string(),
            ));
        }
        if fees > amount {
            return Err(AppError::Validation(
                "Processor fees cannot exceed the amount".to_string(),
            ));
        }
    }
    Ok(())
}

/// Finds the cause a donation refers to, creating it on first use. The
/// reference is either a cause id or a name; `other_cause` wins as the name
/// when given.
pub async fn resolve_cause(
    store: &dyn Store,
    reference: &str,
    other_cause: Option<&str>,
) -> AppResult<DonationCause> {
    let reference = reference.trim();
    if let Ok(id) = Uuid::parse_str(reference) {
        if let Some(cause) = store.find_cause(id).await? {
            return Ok(cause);
        }
    }

    let other_cause = other_cause.map(str::trim).filter(|s| !s.is_empty());
    let name = other_cause.unwrap_or(reference);

    if let Some(cause) = store.find_cause_by_name(name).await? {
        return Ok(cause);
    }

    match store.insert_cause(name, other_cause).await? {
        Some(cause) => {
            info!("Created donation cause '{}'", cause.name);
            Ok(cause)
        }
        // Lost the race to a concurrent insert of the same name
        None => store.find_cause_by_name(name).await?.ok_or_else(|| {
            AppError::Internal(format!("Cause '{}' vanished after conflict", name))
        }),
    }
}

pub async fn create_donation(
    state: &AppState,
    account: Option<(&User, &Donor)>,
    request: CreateDonationRequest,
    origin: DonationOrigin,
) -> AppResult<Donation> {
    check_amounts(request.amount, request.processor_fees)?;
    if request.cause_id.trim().is_empty() {
        return Err(AppError::Validation("causeId is required".to_string()));
    }

    let cause = resolve_cause(
        state.store.as_ref(),
        &request.cause_id,
        request.other_cause.as_deref(),
    )
    .await?;

    let recorded_at = Utc::now();
    let (status, verified_at) = match origin {
        DonationOrigin::Donor => (DonationStatus::PendingValidation, None),
        DonationOrigin::WalkIn => (DonationStatus::Validated, Some(recorded_at)),
    };

    let donation = state
        .store
        .insert_donation(NewDonation {
            donor_id: account.map(|(_, donor)| donor.id),
            cause_id: cause.id,
            donation_type: request.donation_type,
            status,
            amount: request.amount,
            currency: request.currency,
            processor_fees: request.processor_fees,
            net_amount: compute_net_amount(request.amount, request.processor_fees),
            donor_remarks: request.donor_remarks,
            temple_remarks: request.temple_remarks,
            is_anonymous: request.is_anonymous.unwrap_or(false),
            is_tax_deductible: cause.is_tax_deductible,
            recorded_at,
            verified_at,
        })
        .await?;

    info!(
        "Donation {} recorded: {} {} for '{}' ({:?})",
        donation.id,
        donation.amount,
        donation.currency.as_str(),
        cause.name,
        origin
    );

    if let Some((user, donor)) = account {
        let message = donation_acknowledgment(
            &state.config.organization,
            Some(donor),
            &donation,
            &cause.name,
        );
        dispatch(
            state.notifier.clone(),
            preferred_contact(Some(user), Some(donor)),
            message,
        );
    }

    Ok(donation)
}

async fn pending_donation(state: &AppState, id: Uuid) -> AppResult<Donation> {
    let donation = state
        .store
        .find_donation(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Donation {} not found", id)))?;

    if donation.status != DonationStatus::PendingValidation {
        return Err(AppError::Conflict(format!(
            "Donation is already {}",
            donation.status.as_str()
        )));
    }
    Ok(donation)
}

/// Approves or rejects a pending donation. Only the first decision wins.
pub async fn validate_donation(
    state: &AppState,
    id: Uuid,
    approved: bool,
    remarks: Option<String>,
    attachment: Option<Attachment>,
) -> AppResult<Donation> {
    pending_donation(state, id).await?;

    let proof_key = match attachment {
        Some(attachment) => {
            let key = format!("proofs/{}.{}", Uuid::new_v4(), attachment.extension()?);
            state.documents.put(&key, attachment.bytes).await?;
            Some(key)
        }
        None => None,
    };
    let attachment_url = proof_key.as_deref().map(|key| state.config.file_url(key));

    let decision = DonationDecision {
        status: if approved {
            DonationStatus::Validated
        } else {
            DonationStatus::Cancelled
        },
        temple_remarks: remarks.filter(|r| !r.trim().is_empty()),
        attachment_url,
        verified_at: approved.then(Utc::now),
    };

    let decided = match state.store.decide_donation(id, decision).await {
        Ok(decided) => decided,
        Err(e) => {
            discard_proof(state, proof_key.as_deref()).await;
            return Err(e);
        }
    };
    let Some(donation) = decided else {
        // Another decision landed first; its record does not point at our upload
        discard_proof(state, proof_key.as_deref()).await;
        return Err(AppError::Conflict(
            "Donation was already validated".to_string(),
        ));
    };

    info!("Donation {} marked {}", donation.id, donation.status.as_str());

    if approved {
        notify_validated(state, &donation).await;
    }

    Ok(donation)
}

async fn discard_proof(state: &AppState, key: Option<&str>) {
    let Some(key) = key else {
        return;
    };
    if let Err(e) = state.documents.delete(key).await {
        warn!("Could not remove unused proof {}: {}", key, e);
    }
}

async fn notify_validated(state: &AppState, donation: &Donation) {
    let Some(donor_id) = donation.donor_id else {
        return;
    };

    let lookup = async {
        let donor = state.store.find_donor(donor_id).await?;
        let user = match donor.as_ref().and_then(|d| d.user_id) {
            Some(user_id) => state.store.find_user(user_id).await?,
            None => None,
        };
        let cause = state.store.find_cause(donation.cause_id).await?;
        Ok::<_, AppError>((donor, user, cause))
    };

    match lookup.await {
        Ok((Some(donor), user, cause)) => {
            let cause_name = cause.map(|c| c.name).unwrap_or_default();
            let message = donation_validated(
                &state.config.organization,
                Some(&donor),
                donation,
                &cause_name,
            );
            dispatch(
                state.notifier.clone(),
                preferred_contact(user.as_ref(), Some(&donor)),
                message,
            );
        }
        Ok((None, _, _)) => {}
        Err(e) => warn!(
            "Could not prepare validation notice for donation {}: {}",
            donation.id, e
        ),
    }
}

/// Staff edit of a donation that has not been decided yet.
pub async fn update_donation(
    state: &AppState,
    id: Uuid,
    request: UpdateDonationRequest,
) -> AppResult<Donation> {
    let current = pending_donation(state, id).await?;

    let amount = request.amount.unwrap_or(current.amount);
    let processor_fees = request.processor_fees.or(current.processor_fees);
    check_amounts(amount, processor_fees)?;

    let changes = DonationChanges {
        donation_type: request.donation_type.unwrap_or(current.donation_type),
        amount,
        currency: request.currency.unwrap_or(current.currency),
        processor_fees,
        net_amount: compute_net_amount(amount, processor_fees),
        donor_remarks: request.donor_remarks.or(current.donor_remarks),
        temple_remarks: request.temple_remarks.or(current.temple_remarks),
        is_anonymous: request.is_anonymous.unwrap_or(current.is_anonymous),
        is_tax_deductible: request
            .is_tax_deductible
            .unwrap_or(current.is_tax_deductible),
        recorded_at: request.recorded_at.unwrap_or(current.recorded_at),
    };

    state
        .store
        .update_pending_donation(id, changes)
        .await?
        .ok_or_else(|| AppError::Conflict("Donation was validated while editing".to_string()))
}

/// Removes a donation that has not been validated; validated ones may
/// already be on a receipt.
pub async fn delete_donation(state: &AppState, id: Uuid) -> AppResult<()> {
    let donation = state
        .store
        .find_donation(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Donation {} not found", id)))?;

    if donation.status == DonationStatus::Validated {
        return Err(AppError::Conflict(
            "Validated donations cannot be deleted".to_string(),
        ));
    }

    state.store.delete_donation(id).await?;
    info!("Donation {} deleted", id);
    Ok(())
}
