// src/services/reports.rs

use crate::{
    errors::{AppError, AppResult},
    models::{
        DashboardStats, Donation, DonationCause, DonationFilter, DonationStatus, Donor,
        FinancialBreakdown, TaxReceiptReport,
    },
    services::receipts::is_unlocked,
    state::AppState,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

const RECENT_DONATIONS: usize = 5;

pub const CSV_HEADERS: [&str; 13] = [
    "Date Recorded",
    "Date Verified",
    "Donor Name",
    "Email",
    "Cause",
    "Type",
    "Amount",
    "Currency",
    "Processor Fees",
    "Net Amount",
    "Status",
    "Donor Remarks",
    "Temple Remarks",
];

pub async fn dashboard(state: &AppState) -> AppResult<DashboardStats> {
    let validated = state
        .store
        .list_donations(&DonationFilter {
            status: Some(DonationStatus::Validated),
            ..Default::default()
        })
        .await?;
    let mut recent = state.store.list_donations(&DonationFilter::default()).await?;
    recent.truncate(RECENT_DONATIONS);

    Ok(DashboardStats {
        total_donations: state.store.count_donations(None).await?,
        pending_validation: state
            .store
            .count_donations(Some(DonationStatus::PendingValidation))
            .await?,
        total_amount: validated.iter().map(|d| d.amount).sum(),
        donors_count: state.store.count_donors().await?,
        recent_donations: recent,
    })
}

fn group_by<F>(donations: &[Donation], key: F) -> Vec<FinancialBreakdown>
where
    F: Fn(&Donation) -> String,
{
    let mut groups: BTreeMap<String, FinancialBreakdown> = BTreeMap::new();
    for donation in donations {
        let k = key(donation);
        let entry = groups.entry(k.clone()).or_insert_with(|| FinancialBreakdown {
            key: k,
            count: 0,
            total_amount: Decimal::ZERO,
            net_amount: Decimal::ZERO,
        });
        entry.count += 1;
        entry.total_amount += donation.amount;
        entry.net_amount += donation.net_amount;
    }
    groups.into_values().collect()
}

async fn validated_donations(state: &AppState, filter: &DonationFilter) -> AppResult<Vec<Donation>> {
    state
        .store
        .list_donations(&DonationFilter {
            status: Some(DonationStatus::Validated),
            ..filter.clone()
        })
        .await
}

async fn cause_names(state: &AppState) -> AppResult<HashMap<Uuid, String>> {
    Ok(state
        .store
        .list_causes(false)
        .await?
        .into_iter()
        .map(|c: DonationCause| (c.id, c.name))
        .collect())
}

pub async fn by_cause(state: &AppState, filter: &DonationFilter) -> AppResult<Vec<FinancialBreakdown>> {
    let donations = validated_donations(state, filter).await?;
    let names = cause_names(state).await?;
    Ok(group_by(&donations, |d| {
        names
            .get(&d.cause_id)
            .cloned()
            .unwrap_or_else(|| d.cause_id.to_string())
    }))
}

pub async fn by_type(state: &AppState, filter: &DonationFilter) -> AppResult<Vec<FinancialBreakdown>> {
    let donations = validated_donations(state, filter).await?;
    Ok(group_by(&donations, |d| d.donation_type.as_str().to_string()))
}

pub async fn tax_receipt_report(state: &AppState, year: i32) -> AppResult<TaxReceiptReport> {
    let receipts = state.store.list_receipts(None, Some(year)).await?;
    Ok(TaxReceiptReport {
        fiscal_year: year,
        unlocked: is_unlocked(state, year).await?,
        receipt_count: receipts.len() as i64,
        total_amount: receipts.iter().map(|r| r.total_amount).sum(),
        tax_deductible: receipts.iter().map(|r| r.tax_deductible).sum(),
        receipts,
    })
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Renders donations as CSV. Anonymous donors are printed as `Anonymous`
/// without an email.
pub fn render_csv(
    donations: &[Donation],
    donors: &HashMap<Uuid, Donor>,
    causes: &HashMap<Uuid, String>,
) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| AppError::Internal(format!("CSV export failed: {}", e));

    writer.write_record(CSV_HEADERS).map_err(csv_err)?;

    for d in donations {
        let donor = d.donor_id.and_then(|id| donors.get(&id));
        let (name, email) = match donor {
            _ if d.is_anonymous => ("Anonymous".to_string(), String::new()),
            Some(donor) => (donor.full_name(), donor.email.clone().unwrap_or_default()),
            None => ("Walk-in".to_string(), String::new()),
        };

        writer
            .write_record([
                d.recorded_at.format("%Y-%m-%d").to_string(),
                d.verified_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                name,
                email,
                causes.get(&d.cause_id).cloned().unwrap_or_default(),
                d.donation_type.as_str().to_string(),
                money(d.amount),
                d.currency.as_str().to_string(),
                d.processor_fees.map(money).unwrap_or_default(),
                money(d.net_amount),
                d.status.as_str().to_string(),
                d.donor_remarks.clone().unwrap_or_default(),
                d.temple_remarks.clone().unwrap_or_default(),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
}

pub async fn export_csv(state: &AppState, filter: &DonationFilter) -> AppResult<String> {
    let donations = state.store.list_donations(filter).await?;
    let donors = state
        .store
        .list_donors(false)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();
    let causes = cause_names(state).await?;
    render_csv(&donations, &donors, &causes)
}
