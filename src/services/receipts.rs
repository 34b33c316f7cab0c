// src/services/receipts.rs
//
// Year-end tax receipt reconciliation and the per-year visibility gate.

use crate::{
    auth::{AuthUser, approved_donor},
    errors::{AppError, AppResult},
    models::{
        Donor, NewReceipt, Receipt, ReceiptDownload, ReceiptType, ReconciliationSummary,
        YearEndStatus, YearTotals,
    },
    services::pdf::render_receipt,
    state::AppState,
};
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

const READY_KEY_PREFIX: &str = "tax_receipts_ready_";
const ISSUED_KEY_PREFIX: &str = "tax_receipts_issued_";

fn ready_key(year: i32) -> String {
    format!("{}{}", READY_KEY_PREFIX, year)
}

fn issued_key(year: i32) -> String {
    format!("{}{}", ISSUED_KEY_PREFIX, year)
}

/// `YE<year>-<first 8 hex digits of the donor id>`, e.g. `YE2024-0A1B2C3D`.
pub fn receipt_number(year: i32, donor_id: Uuid) -> String {
    let hex = donor_id.simple().to_string();
    format!("YE{}-{}", year, hex[..8].to_uppercase())
}

/// Fallback number carrying the whole donor id, used when the short form is
/// already held by another donor.
fn full_receipt_number(year: i32, donor_id: Uuid) -> String {
    format!("YE{}-{}", year, donor_id.simple().to_string().to_uppercase())
}

/// `[Jan 1 of year, Jan 1 of next year)` in UTC.
pub fn fiscal_year_bounds(year: i32) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single();
    let end = year
        .checked_add(1)
        .and_then(|next| Utc.with_ymd_and_hms(next, 1, 1, 0, 0, 0).single());
    match (start, end) {
        (Some(start), Some(end)) if (1900..=9999).contains(&year) => Ok((start, end)),
        _ => Err(AppError::Validation(format!("Invalid fiscal year {}", year))),
    }
}

fn receipt_key(receipt: &Receipt) -> String {
    format!(
        "receipts/{}/{}.pdf",
        receipt.fiscal_year, receipt.receipt_number
    )
}

// ─── Visibility Gate ──────────────────────────────────────────────────────────

pub async fn is_unlocked(state: &AppState, year: i32) -> AppResult<bool> {
    Ok(state.store.get_setting(&ready_key(year)).await?.is_some())
}

pub async fn unlock_year(state: &AppState, year: i32) -> AppResult<YearEndStatus> {
    fiscal_year_bounds(year)?;
    state
        .store
        .upsert_setting(&ready_key(year), &Utc::now().to_rfc3339())
        .await?;
    info!("Tax receipts for {} unlocked for donors", year);
    year_status(state, year).await
}

pub async fn lock_year(state: &AppState, year: i32) -> AppResult<YearEndStatus> {
    fiscal_year_bounds(year)?;
    state.store.delete_setting(&ready_key(year)).await?;
    info!("Tax receipts for {} locked", year);
    year_status(state, year).await
}

pub async fn year_status(state: &AppState, year: i32) -> AppResult<YearEndStatus> {
    let unlocked = is_unlocked(state, year).await?;
    let issued_at = state
        .store
        .get_setting(&issued_key(year))
        .await?
        .and_then(|s| DateTime::parse_from_rfc3339(&s.value).ok())
        .map(|t| t.with_timezone(&Utc));

    Ok(YearEndStatus {
        year,
        unlocked,
        issued_at,
    })
}

// ─── Rendering ────────────────────────────────────────────────────────────────

/// Renders and stores the receipt PDF if it has none yet.
pub async fn ensure_receipt_file(
    state: &AppState,
    receipt: Receipt,
    donor: Option<&Donor>,
) -> AppResult<Receipt> {
    if receipt.file_url.is_some() {
        return Ok(receipt);
    }

    let fetched;
    let donor = match donor {
        Some(donor) => donor,
        None => {
            fetched = state
                .store
                .find_donor(receipt.donor_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Donor {} not found", receipt.donor_id))
                })?;
            &fetched
        }
    };

    let bytes = render_receipt(&state.config.organization, donor, &receipt)?;
    let key = receipt_key(&receipt);
    state.documents.put(&key, bytes).await?;

    state
        .store
        .set_receipt_file(receipt.id, &state.config.file_url(&key))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Receipt {} not found", receipt.id)))
}

/// Inserts the donor's tax receipt for `year`. `None` means a receipt for
/// (donor, year) already exists.
async fn insert_tax_receipt(
    state: &AppState,
    donor: &Donor,
    year: i32,
    totals: YearTotals,
) -> AppResult<Option<Receipt>> {
    let new_receipt = |receipt_number| NewReceipt {
        receipt_number,
        donor_id: donor.id,
        receipt_type: ReceiptType::TaxReceipt,
        fiscal_year: year,
        total_amount: totals.total_amount,
        tax_deductible: totals.tax_deductible,
        issued_at: Utc::now(),
    };

    let short = receipt_number(year, donor.id);
    match state.store.insert_receipt(new_receipt(short.clone())).await {
        Err(AppError::Conflict(_)) => {
            let full = full_receipt_number(year, donor.id);
            warn!(
                "Receipt number {} is taken, issuing {} for donor {}",
                short, full, donor.id
            );
            state.store.insert_receipt(new_receipt(full)).await
        }
        other => other,
    }
}

// ─── Reconciliation ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileScope {
    AllDonors,
    Donor(Uuid),
}

enum DonorOutcome {
    Created,
    Skipped,
}

async fn reconcile_donor(
    state: &AppState,
    donor: &Donor,
    year: i32,
    bounds: (DateTime<Utc>, DateTime<Utc>),
) -> AppResult<DonorOutcome> {
    if let Some(existing) = state
        .store
        .find_receipt_for(donor.id, year, ReceiptType::TaxReceipt)
        .await?
    {
        if existing.file_url.is_none() {
            let number = existing.receipt_number.clone();
            if let Err(e) = ensure_receipt_file(state, existing, Some(donor)).await {
                warn!("Could not backfill PDF for receipt {}: {}", number, e);
            }
        }
        return Ok(DonorOutcome::Skipped);
    }

    let totals = state.store.donor_totals(donor.id, bounds.0, bounds.1).await?;
    if totals.total_amount.is_zero() {
        return Ok(DonorOutcome::Skipped);
    }

    // A concurrent run got there first
    let Some(receipt) = insert_tax_receipt(state, donor, year, totals).await? else {
        return Ok(DonorOutcome::Skipped);
    };

    ensure_receipt_file(state, receipt, Some(donor)).await?;
    Ok(DonorOutcome::Created)
}

/// Issues one tax receipt per donor with validated, tax-deductible donations
/// in `year`.
/// Safe to re-run: donors that already have a receipt are skipped.
pub async fn reconcile_year(
    state: &AppState,
    year: i32,
    scope: ReconcileScope,
) -> AppResult<ReconciliationSummary> {
    let bounds = fiscal_year_bounds(year)?;

    let donors = match scope {
        ReconcileScope::AllDonors => state.store.list_donors(true).await?,
        ReconcileScope::Donor(id) => vec![
            state
                .store
                .find_donor(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Donor {} not found", id)))?,
        ],
    };

    info!(
        "Reconciling {} tax receipts for {} donor(s)",
        year,
        donors.len()
    );

    let (mut created, mut skipped, mut errors) = (0u32, 0u32, 0u32);
    let batch_size = state.config.receipt_batch_size.max(1);

    for batch in donors.chunks(batch_size) {
        let results = join_all(
            batch
                .iter()
                .map(|donor| reconcile_donor(state, donor, year, bounds)),
        )
        .await;

        for (donor, result) in batch.iter().zip(results) {
            match result {
                Ok(DonorOutcome::Created) => created += 1,
                Ok(DonorOutcome::Skipped) => skipped += 1,
                Err(e) => {
                    error!(
                        "Failed to issue {} receipt for donor {}: {}",
                        year, donor.id, e
                    );
                    errors += 1;
                }
            }
        }
    }

    let ready_at = Utc::now();
    state
        .store
        .upsert_setting(&issued_key(year), &ready_at.to_rfc3339())
        .await?;

    info!(
        "Reconciliation {} done: created={} skipped={} errors={}",
        year, created, skipped, errors
    );

    Ok(ReconciliationSummary {
        created,
        skipped,
        errors,
        year,
        ready_at,
    })
}

// ─── Donor Self-Service ───────────────────────────────────────────────────────

pub async fn generate_for_donor(state: &AppState, donor: &Donor, year: i32) -> AppResult<Receipt> {
    let (from, until) = fiscal_year_bounds(year)?;

    if !is_unlocked(state, year).await? {
        return Err(AppError::Forbidden(format!(
            "Tax receipts for {} are not available yet",
            year
        )));
    }

    if let Some(existing) = state
        .store
        .find_receipt_for(donor.id, year, ReceiptType::TaxReceipt)
        .await?
    {
        return ensure_receipt_file(state, existing, Some(donor)).await;
    }

    let totals = state.store.donor_totals(donor.id, from, until).await?;
    if totals.total_amount.is_zero() {
        return Err(AppError::BadRequest(format!(
            "No validated tax-deductible donations found for {}",
            year
        )));
    }

    let receipt = match insert_tax_receipt(state, donor, year, totals).await? {
        Some(receipt) => receipt,
        None => state
            .store
            .find_receipt_for(donor.id, year, ReceiptType::TaxReceipt)
            .await?
            .ok_or_else(|| AppError::Internal("Receipt vanished after conflict".to_string()))?,
    };

    info!("Receipt {} issued on request", receipt.receipt_number);
    ensure_receipt_file(state, receipt, Some(donor)).await
}

/// Receipts of `donor` for years that have been unlocked.
pub async fn visible_receipts(state: &AppState, donor: &Donor) -> AppResult<Vec<Receipt>> {
    let receipts = state.store.list_receipts(Some(donor.id), None).await?;

    let mut unlocked: HashMap<i32, bool> = HashMap::new();
    let mut visible = Vec::with_capacity(receipts.len());
    for receipt in receipts {
        let open = match unlocked.get(&receipt.fiscal_year) {
            Some(open) => *open,
            None => {
                let open = is_unlocked(state, receipt.fiscal_year).await?;
                unlocked.insert(receipt.fiscal_year, open);
                open
            }
        };
        if open {
            visible.push(receipt);
        }
    }
    Ok(visible)
}

/// Loads a receipt the caller may see: staff see all, donors only their own
/// receipts for unlocked years.
pub async fn accessible_receipt(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<Receipt> {
    let receipt = state
        .store
        .find_receipt(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Receipt {} not found", id)))?;

    if auth.is_staff() {
        return Ok(receipt);
    }

    let (_, donor) = approved_donor(state, auth).await?;
    if receipt.donor_id != donor.id {
        return Err(AppError::Forbidden(
            "You can only access your own receipts".to_string(),
        ));
    }
    if !is_unlocked(state, receipt.fiscal_year).await? {
        return Err(AppError::Forbidden(format!(
            "Tax receipts for {} are not available yet",
            receipt.fiscal_year
        )));
    }
    Ok(receipt)
}

pub async fn download_receipt(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ReceiptDownload> {
    let receipt = accessible_receipt(state, auth, id).await?;
    let receipt = ensure_receipt_file(state, receipt, None).await?;

    let receipt_url = receipt
        .file_url
        .clone()
        .ok_or_else(|| AppError::Internal("Receipt has no file after rendering".to_string()))?;

    Ok(ReceiptDownload {
        receipt_id: receipt.id,
        receipt_number: receipt.receipt_number,
        receipt_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Currency, DonationStatus, DonationType, NewDonation, UserRole},
        services::donations::compute_net_amount,
        test_support::{TestApp, test_app},
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn donate(
        app: &TestApp,
        donor: &Donor,
        amount: Decimal,
        fees: Option<Decimal>,
        status: DonationStatus,
        recorded_at: DateTime<Utc>,
        is_tax_deductible: bool,
    ) {
        let cause = app.cause(&format!("Cause {}", Uuid::new_v4()));
        app.state
            .store
            .insert_donation(NewDonation {
                donor_id: Some(donor.id),
                cause_id: cause.id,
                donation_type: DonationType::Interac,
                status,
                amount,
                currency: Currency::Cad,
                processor_fees: fees,
                net_amount: compute_net_amount(amount, fees),
                donor_remarks: None,
                temple_remarks: None,
                is_anonymous: false,
                is_tax_deductible,
                recorded_at,
                verified_at: Some(recorded_at),
            })
            .await
            .unwrap();
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn receipt_number_uses_the_donor_id_prefix() {
        let id = Uuid::parse_str("0a1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d").unwrap();
        assert_eq!(receipt_number(2024, id), "YE2024-0A1B2C3D");
    }

    #[test]
    fn fiscal_year_is_half_open() {
        let (from, until) = fiscal_year_bounds(2024).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(fiscal_year_bounds(0).is_err());
    }

    #[tokio::test]
    async fn end_to_end_reconciliation() {
        let app = test_app();
        let donor = app.offline_donor("Amara").await;

        let first = reconcile_year(&app.state, 2024, ReconcileScope::AllDonors)
            .await
            .unwrap();
        assert_eq!((first.created, first.skipped, first.errors), (0, 1, 0));

        donate(&app, &donor, dec!(75.00), Some(dec!(2.00)), DonationStatus::Validated, at(2024, 6, 1), true).await;

        let second = reconcile_year(&app.state, 2024, ReconcileScope::AllDonors)
            .await
            .unwrap();
        assert_eq!((second.created, second.skipped, second.errors), (1, 0, 0));

        let receipt = app
            .state
            .store
            .find_receipt_for(donor.id, 2024, ReceiptType::TaxReceipt)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.total_amount, dec!(75.00));
        assert_eq!(receipt.tax_deductible, dec!(73.00));
        assert_eq!(receipt.receipt_number, receipt_number(2024, donor.id));
        let key = format!("receipts/2024/{}.pdf", receipt.receipt_number);
        assert_eq!(
            receipt.file_url.as_deref(),
            Some(format!("http://files.test/files/{}", key).as_str())
        );
        assert!(app.documents.get(&key).unwrap().starts_with(b"%PDF"));

        let status = year_status(&app.state, 2024).await.unwrap();
        assert_eq!(status.issued_at.map(|t| t.timestamp()), Some(second.ready_at.timestamp()));
        assert!(!status.unlocked);
    }

    #[tokio::test]
    async fn rerun_creates_nothing_new() {
        let app = test_app();
        for name in ["A", "B", "C"] {
            let donor = app.offline_donor(name).await;
            donate(&app, &donor, dec!(10), None, DonationStatus::Validated, at(2024, 3, 1), true).await;
        }
        app.offline_donor("NoGifts").await;

        let first = reconcile_year(&app.state, 2024, ReconcileScope::AllDonors)
            .await
            .unwrap();
        assert_eq!((first.created, first.skipped), (3, 1));

        let second = reconcile_year(&app.state, 2024, ReconcileScope::AllDonors)
            .await
            .unwrap();
        assert_eq!((second.created, second.skipped, second.errors), (0, 4, 0));
        assert_eq!(app.state.store.list_receipts(None, Some(2024)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn only_validated_in_year_donations_count() {
        let app = test_app();
        let donor = app.offline_donor("Amara").await;
        donate(&app, &donor, dec!(100), None, DonationStatus::PendingValidation, at(2024, 5, 1), true).await;
        donate(&app, &donor, dec!(100), None, DonationStatus::Cancelled, at(2024, 5, 1), true).await;
        donate(&app, &donor, dec!(100), None, DonationStatus::Validated, at(2025, 1, 1), true).await;
        donate(
            &app,
            &donor,
            dec!(5),
            None,
            DonationStatus::Validated,
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap(),
            true,
        )
        .await;

        let summary = reconcile_year(&app.state, 2024, ReconcileScope::AllDonors)
            .await
            .unwrap();
        assert_eq!((summary.created, summary.skipped), (0, 1));

        donate(&app, &donor, dec!(40), None, DonationStatus::Validated, at(2024, 12, 31), false).await;
        donate(&app, &donor, dec!(60), Some(dec!(1.50)), DonationStatus::Validated, at(2024, 1, 1), true).await;

        reconcile_year(&app.state, 2024, ReconcileScope::Donor(donor.id))
            .await
            .unwrap();
        let receipt = app
            .state
            .store
            .find_receipt_for(donor.id, 2024, ReceiptType::TaxReceipt)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.total_amount, dec!(60));
        assert_eq!(receipt.tax_deductible, dec!(58.50));
    }

    #[tokio::test]
    async fn donor_with_only_non_deductible_gifts_gets_no_receipt() {
        let app = test_app();
        let donor = app.offline_donor("Amara").await;
        donate(&app, &donor, dec!(100), None, DonationStatus::Validated, at(2024, 4, 4), false).await;

        let summary = reconcile_year(&app.state, 2024, ReconcileScope::AllDonors)
            .await
            .unwrap();
        assert_eq!((summary.created, summary.skipped, summary.errors), (0, 1, 0));
        assert!(app
            .state
            .store
            .find_receipt_for(donor.id, 2024, ReceiptType::TaxReceipt)
            .await
            .unwrap()
            .is_none());
    }

    async fn take_number_of(app: &TestApp, holder: &Donor, owner: &Donor) {
        app.state
            .store
            .insert_receipt(NewReceipt {
                receipt_number: receipt_number(2024, owner.id),
                donor_id: holder.id,
                receipt_type: ReceiptType::TaxReceipt,
                fiscal_year: 2024,
                total_amount: dec!(1),
                tax_deductible: dec!(1),
                issued_at: Utc::now(),
            })
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn taken_receipt_number_falls_back_to_the_full_donor_id() {
        let app = test_app();
        let holder = app.offline_donor("Holder").await;
        let donor = app.offline_donor("Amara").await;
        donate(&app, &donor, dec!(50), None, DonationStatus::Validated, at(2024, 9, 9), true).await;
        take_number_of(&app, &holder, &donor).await;

        let summary = reconcile_year(&app.state, 2024, ReconcileScope::Donor(donor.id))
            .await
            .unwrap();
        assert_eq!((summary.created, summary.skipped, summary.errors), (1, 0, 0));

        let receipt = app
            .state
            .store
            .find_receipt_for(donor.id, 2024, ReceiptType::TaxReceipt)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.receipt_number, full_receipt_number(2024, donor.id));
        assert_eq!(receipt.total_amount, dec!(50));
        assert!(receipt.file_url.is_some());
    }

    #[tokio::test]
    async fn self_service_survives_a_taken_receipt_number() {
        let app = test_app();
        let holder = app.offline_donor("Holder").await;
        let (_, donor) = app.donor("Amara", true).await;
        donate(&app, &donor, dec!(25), None, DonationStatus::Validated, at(2024, 2, 2), true).await;
        take_number_of(&app, &holder, &donor).await;
        unlock_year(&app.state, 2024).await.unwrap();

        let receipt = generate_for_donor(&app.state, &donor, 2024).await.unwrap();
        assert_eq!(receipt.donor_id, donor.id);
        assert_eq!(receipt.receipt_number, full_receipt_number(2024, donor.id));
    }

    #[tokio::test]
    async fn one_failing_donor_does_not_stop_the_batch() {
        let app = test_app();
        let mut donors = Vec::new();
        for name in ["A", "B", "C"] {
            let donor = app.offline_donor(name).await;
            donate(&app, &donor, dec!(20), None, DonationStatus::Validated, at(2024, 8, 8), true).await;
            donors.push(donor);
        }
        app.documents.fail_on(&receipt_number(2024, donors[1].id));

        let summary = reconcile_year(&app.state, 2024, ReconcileScope::AllDonors)
            .await
            .unwrap();
        assert_eq!((summary.created, summary.skipped, summary.errors), (2, 0, 1));

        // The next run backfills the missing PDF
        app.documents.heal();
        let rerun = reconcile_year(&app.state, 2024, ReconcileScope::AllDonors)
            .await
            .unwrap();
        assert_eq!((rerun.created, rerun.skipped, rerun.errors), (0, 3, 0));
        let receipt = app
            .state
            .store
            .find_receipt_for(donors[1].id, 2024, ReceiptType::TaxReceipt)
            .await
            .unwrap()
            .unwrap();
        assert!(receipt.file_url.is_some());
    }

    #[tokio::test]
    async fn self_service_respects_the_year_lock() {
        let app = test_app();
        let (_, donor) = app.donor("Amara", true).await;
        donate(&app, &donor, dec!(75.00), Some(dec!(2.00)), DonationStatus::Validated, at(2024, 6, 1), true).await;

        let err = generate_for_donor(&app.state, &donor, 2024).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        unlock_year(&app.state, 2024).await.unwrap();
        let receipt = generate_for_donor(&app.state, &donor, 2024).await.unwrap();
        assert!(receipt.file_url.is_some());
        assert_eq!(receipt.tax_deductible, dec!(73.00));

        let again = generate_for_donor(&app.state, &donor, 2024).await.unwrap();
        assert_eq!(again.id, receipt.id);

        lock_year(&app.state, 2024).await.unwrap();
        let err = generate_for_donor(&app.state, &donor, 2024).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn self_service_with_no_donations_is_a_bad_request() {
        let app = test_app();
        let (_, donor) = app.donor("Amara", true).await;
        unlock_year(&app.state, 2023).await.unwrap();

        let err = generate_for_donor(&app.state, &donor, 2023).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn downloads_are_limited_to_owner_and_staff() {
        let app = test_app();
        let (owner_user, owner) = app.donor("Amara", true).await;
        let (other_user, _) = app.donor("Kamal", true).await;
        let accountant = app.staff(UserRole::Accountant).await;
        donate(&app, &owner, dec!(30), None, DonationStatus::Validated, at(2024, 2, 2), true).await;

        reconcile_year(&app.state, 2024, ReconcileScope::AllDonors)
            .await
            .unwrap();
        let receipt = app.state.store.list_receipts(Some(owner.id), None).await.unwrap().remove(0);

        let as_owner = AuthUser { id: owner_user.id, role: UserRole::Donor };
        let as_other = AuthUser { id: other_user.id, role: UserRole::Donor };
        let as_staff = AuthUser { id: accountant.id, role: UserRole::Accountant };

        // Locked year: only staff
        assert!(matches!(
            download_receipt(&app.state, &as_owner, receipt.id).await,
            Err(AppError::Forbidden(_))
        ));
        let staff_view = download_receipt(&app.state, &as_staff, receipt.id).await.unwrap();
        assert_eq!(staff_view.receipt_number, receipt.receipt_number);

        unlock_year(&app.state, 2024).await.unwrap();
        assert!(download_receipt(&app.state, &as_owner, receipt.id).await.is_ok());
        assert!(matches!(
            download_receipt(&app.state, &as_other, receipt.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(visible_receipts(&app.state, &owner).await.unwrap().len(), 1);
    }
}
