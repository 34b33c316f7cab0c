//! In-memory `Store` used by the test suite. Mirrors the uniqueness rules and
//! conditional updates of the Postgres schema.

use super::Store;
use crate::{
    errors::{AppError, AppResult},
    models::{
        AlokaPuja, Donation, DonationCause, DonationChanges, DonationDecision, DonationFilter,
        DonationStatus, Donor, NewAlokaPuja, NewDonation, NewDonor, NewReceipt, NewUser, Receipt,
        ReceiptType, SystemSetting, UpdateAlokaPujaRequest, UpdateDonorRequest, User, YearTotals,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use std::{collections::HashMap, sync::Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    donors: Vec<Donor>,
    causes: Vec<DonationCause>,
    donations: Vec<Donation>,
    receipts: Vec<Receipt>,
    settings: HashMap<String, SystemSetting>,
    pujas: Vec<AlokaPuja>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a cause directly, bypassing name resolution.
    pub fn add_cause(&self, name: &str, is_tax_deductible: bool) -> DonationCause {
        let cause = DonationCause {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            is_tax_deductible,
            is_active: true,
            created_at: Utc::now(),
        };
        self.lock().causes.push(cause.clone());
        cause
    }

    pub fn cause_count(&self) -> usize {
        self.lock().causes.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A panicking test must not poison the store for the assertions after it
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn duplicate(target: &str) -> AppError {
    AppError::Conflict(format!("A record with this {} already exists", target))
}

fn same(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

fn build_user(user: NewUser) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: user.email,
        phone: user.phone,
        username: user.username,
        password_hash: user.password_hash,
        role: user.role,
        is_active: user.is_active,
        created_at: now,
        updated_at: now,
    }
}

fn build_donor(donor: NewDonor) -> Donor {
    let now = Utc::now();
    Donor {
        id: Uuid::new_v4(),
        user_id: donor.user_id,
        primary_donor_id: donor.primary_donor_id,
        first_name: donor.first_name,
        last_name: donor.last_name,
        email: donor.email,
        mobile: donor.mobile,
        landline: donor.landline,
        address: donor.address,
        city: donor.city,
        province: donor.province,
        postal_code: donor.postal_code,
        country: donor.country,
        is_active: donor.is_active,
        created_at: now,
        updated_at: now,
    }
}

impl Tables {
    fn check_user_unique(&self, user: &NewUser) -> AppResult<()> {
        for existing in &self.users {
            if same(&existing.email, &user.email) {
                return Err(duplicate("users_email_key"));
            }
            if same(&existing.phone, &user.phone) {
                return Err(duplicate("users_phone_key"));
            }
            if same(&existing.username, &user.username) {
                return Err(duplicate("users_username_key"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    // ─── Users ────────────────────────────────────────────────────────────

    async fn create_user_with_donor(
        &self,
        user: NewUser,
        donor: NewDonor,
    ) -> AppResult<(User, Donor)> {
        let mut tables = self.lock();
        tables.check_user_unique(&user)?;
        let user = build_user(user);
        let donor = build_donor(NewDonor {
            user_id: Some(user.id),
            ..donor
        });
        tables.users.push(user.clone());
        tables.donors.push(donor.clone());
        Ok((user, donor))
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.lock();
        tables.check_user_unique(&user)?;
        let user = build_user(user);
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        let wanted = Some(identifier.to_string());
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| same(&u.email, &wanted) || same(&u.phone, &wanted) || same(&u.username, &wanted))
            .cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut users = self.lock().users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn activate_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let mut tables = self.lock();
        let now = Utc::now();
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.is_active = true;
        user.updated_at = now;
        let user = user.clone();
        for donor in tables.donors.iter_mut().filter(|d| d.user_id == Some(id)) {
            donor.is_active = true;
            donor.updated_at = now;
        }
        Ok(Some(user))
    }

    // ─── Donors ───────────────────────────────────────────────────────────

    async fn insert_donor(&self, donor: NewDonor) -> AppResult<Donor> {
        let donor = build_donor(donor);
        self.lock().donors.push(donor.clone());
        Ok(donor)
    }

    async fn find_donor(&self, id: Uuid) -> AppResult<Option<Donor>> {
        Ok(self.lock().donors.iter().find(|d| d.id == id).cloned())
    }

    async fn find_donor_by_user(&self, user_id: Uuid) -> AppResult<Option<Donor>> {
        Ok(self
            .lock()
            .donors
            .iter()
            .find(|d| d.user_id == Some(user_id))
            .cloned())
    }

    async fn list_donors(&self, active_only: bool) -> AppResult<Vec<Donor>> {
        let mut donors: Vec<Donor> = self
            .lock()
            .donors
            .iter()
            .filter(|d| !active_only || d.is_active)
            .cloned()
            .collect();
        donors.sort_by(|a, b| {
            (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
        });
        Ok(donors)
    }

    async fn count_donors(&self) -> AppResult<i64> {
        Ok(self.lock().donors.len() as i64)
    }

    async fn update_donor(
        &self,
        id: Uuid,
        changes: UpdateDonorRequest,
    ) -> AppResult<Option<Donor>> {
        let mut tables = self.lock();
        let Some(donor) = tables.donors.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.first_name {
            donor.first_name = v;
        }
        if let Some(v) = changes.last_name {
            donor.last_name = v;
        }
        if changes.email.is_some() {
            donor.email = changes.email;
        }
        if changes.mobile.is_some() {
            donor.mobile = changes.mobile;
        }
        if changes.landline.is_some() {
            donor.landline = changes.landline;
        }
        if let Some(v) = changes.address {
            donor.address = v;
        }
        if let Some(v) = changes.city {
            donor.city = v;
        }
        if let Some(v) = changes.province {
            donor.province = v;
        }
        if let Some(v) = changes.postal_code {
            donor.postal_code = v;
        }
        if let Some(v) = changes.country {
            donor.country = v;
        }
        donor.updated_at = Utc::now();
        Ok(Some(donor.clone()))
    }

    async fn family_members(&self, primary_donor_id: Uuid) -> AppResult<Vec<Donor>> {
        let mut members: Vec<Donor> = self
            .lock()
            .donors
            .iter()
            .filter(|d| d.primary_donor_id == Some(primary_donor_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.first_name.cmp(&b.first_name));
        Ok(members)
    }

    async fn set_donor_active(&self, id: Uuid, active: bool) -> AppResult<bool> {
        let mut tables = self.lock();
        match tables.donors.iter_mut().find(|d| d.id == id) {
            Some(donor) => {
                donor.is_active = active;
                donor.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_donor(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.lock();
        let before = tables.donors.len();
        tables.donors.retain(|d| d.id != id);
        tables.pujas.retain(|p| p.donor_id != id);
        Ok(tables.donors.len() < before)
    }

    // ─── Causes ───────────────────────────────────────────────────────────

    async fn find_cause(&self, id: Uuid) -> AppResult<Option<DonationCause>> {
        Ok(self.lock().causes.iter().find(|c| c.id == id).cloned())
    }

    async fn find_cause_by_name(&self, name: &str) -> AppResult<Option<DonationCause>> {
        let wanted = name.to_lowercase();
        Ok(self
            .lock()
            .causes
            .iter()
            .find(|c| c.name.to_lowercase() == wanted)
            .cloned())
    }

    async fn insert_cause(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Option<DonationCause>> {
        let mut tables = self.lock();
        let wanted = name.to_lowercase();
        if tables.causes.iter().any(|c| c.name.to_lowercase() == wanted) {
            return Ok(None);
        }
        let cause = DonationCause {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            is_tax_deductible: true,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.causes.push(cause.clone());
        Ok(Some(cause))
    }

    async fn list_causes(&self, active_only: bool) -> AppResult<Vec<DonationCause>> {
        let mut causes: Vec<DonationCause> = self
            .lock()
            .causes
            .iter()
            .filter(|c| !active_only || c.is_active)
            .cloned()
            .collect();
        causes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(causes)
    }

    // ─── Donations ────────────────────────────────────────────────────────

    async fn insert_donation(&self, donation: NewDonation) -> AppResult<Donation> {
        let mut tables = self.lock();
        if donation.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest("amount must be positive".to_string()));
        }
        if !tables.causes.iter().any(|c| c.id == donation.cause_id) {
            return Err(AppError::BadRequest(
                "Invalid reference to related record".to_string(),
            ));
        }
        let now = Utc::now();
        let donation = Donation {
            id: Uuid::new_v4(),
            donor_id: donation.donor_id,
            cause_id: donation.cause_id,
            donation_type: donation.donation_type,
            status: donation.status,
            amount: donation.amount,
            currency: donation.currency,
            processor_fees: donation.processor_fees,
            net_amount: donation.net_amount,
            donor_remarks: donation.donor_remarks,
            temple_remarks: donation.temple_remarks,
            attachment_url: None,
            is_anonymous: donation.is_anonymous,
            is_tax_deductible: donation.is_tax_deductible,
            recorded_at: donation.recorded_at,
            verified_at: donation.verified_at,
            created_at: now,
            updated_at: now,
        };
        tables.donations.push(donation.clone());
        Ok(donation)
    }

    async fn find_donation(&self, id: Uuid) -> AppResult<Option<Donation>> {
        Ok(self.lock().donations.iter().find(|d| d.id == id).cloned())
    }

    async fn list_donations(&self, filter: &DonationFilter) -> AppResult<Vec<Donation>> {
        let mut donations: Vec<Donation> = self
            .lock()
            .donations
            .iter()
            .filter(|d| filter.status.is_none_or(|s| d.status == s))
            .filter(|d| filter.donor_id.is_none_or(|id| d.donor_id == Some(id)))
            .filter(|d| filter.cause_id.is_none_or(|id| d.cause_id == id))
            .filter(|d| filter.from.is_none_or(|from| d.recorded_at >= from))
            .filter(|d| filter.to.is_none_or(|to| d.recorded_at <= to))
            .cloned()
            .collect();
        donations.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(donations)
    }

    async fn count_donations(&self, status: Option<DonationStatus>) -> AppResult<i64> {
        Ok(self
            .lock()
            .donations
            .iter()
            .filter(|d| status.is_none_or(|s| d.status == s))
            .count() as i64)
    }

    async fn count_donor_donations(&self, donor_id: Uuid) -> AppResult<i64> {
        Ok(self
            .lock()
            .donations
            .iter()
            .filter(|d| d.donor_id == Some(donor_id))
            .count() as i64)
    }

    async fn decide_donation(
        &self,
        id: Uuid,
        decision: DonationDecision,
    ) -> AppResult<Option<Donation>> {
        let mut tables = self.lock();
        let Some(donation) = tables
            .donations
            .iter_mut()
            .find(|d| d.id == id && d.status == DonationStatus::PendingValidation)
        else {
            return Ok(None);
        };
        donation.status = decision.status;
        if decision.temple_remarks.is_some() {
            donation.temple_remarks = decision.temple_remarks;
        }
        if decision.attachment_url.is_some() {
            donation.attachment_url = decision.attachment_url;
        }
        donation.verified_at = decision.verified_at;
        donation.updated_at = Utc::now();
        Ok(Some(donation.clone()))
    }

    async fn update_pending_donation(
        &self,
        id: Uuid,
        changes: DonationChanges,
    ) -> AppResult<Option<Donation>> {
        let mut tables = self.lock();
        let Some(donation) = tables
            .donations
            .iter_mut()
            .find(|d| d.id == id && d.status == DonationStatus::PendingValidation)
        else {
            return Ok(None);
        };
        donation.donation_type = changes.donation_type;
        donation.amount = changes.amount;
        donation.currency = changes.currency;
        donation.processor_fees = changes.processor_fees;
        donation.net_amount = changes.net_amount;
        donation.donor_remarks = changes.donor_remarks;
        donation.temple_remarks = changes.temple_remarks;
        donation.is_anonymous = changes.is_anonymous;
        donation.is_tax_deductible = changes.is_tax_deductible;
        donation.recorded_at = changes.recorded_at;
        donation.updated_at = Utc::now();
        Ok(Some(donation.clone()))
    }

    async fn delete_donation(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.lock();
        let before = tables.donations.len();
        tables.donations.retain(|d| d.id != id);
        Ok(tables.donations.len() < before)
    }

    async fn donor_totals(
        &self,
        donor_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<YearTotals> {
        let tables = self.lock();
        let mut totals = YearTotals::default();
        for donation in tables.donations.iter().filter(|d| {
            d.donor_id == Some(donor_id)
                && d.status == DonationStatus::Validated
                && d.is_tax_deductible
                && d.recorded_at >= from
                && d.recorded_at < until
        }) {
            totals.total_amount += donation.amount;
            totals.tax_deductible += donation.net_amount;
            totals.donation_count += 1;
        }
        Ok(totals)
    }

    // ─── Receipts ─────────────────────────────────────────────────────────

    async fn find_receipt(&self, id: Uuid) -> AppResult<Option<Receipt>> {
        Ok(self.lock().receipts.iter().find(|r| r.id == id).cloned())
    }

    async fn find_receipt_for(
        &self,
        donor_id: Uuid,
        fiscal_year: i32,
        receipt_type: ReceiptType,
    ) -> AppResult<Option<Receipt>> {
        Ok(self
            .lock()
            .receipts
            .iter()
            .find(|r| {
                r.donor_id == donor_id
                    && r.fiscal_year == fiscal_year
                    && r.receipt_type == receipt_type
            })
            .cloned())
    }

    async fn insert_receipt(&self, receipt: NewReceipt) -> AppResult<Option<Receipt>> {
        let mut tables = self.lock();
        let exists = tables.receipts.iter().any(|r| {
            r.donor_id == receipt.donor_id
                && r.fiscal_year == receipt.fiscal_year
                && r.receipt_type == receipt.receipt_type
        });
        if exists {
            return Ok(None);
        }
        if tables
            .receipts
            .iter()
            .any(|r| r.receipt_number == receipt.receipt_number)
        {
            return Err(duplicate("receipt number"));
        }
        let receipt = Receipt {
            id: Uuid::new_v4(),
            receipt_number: receipt.receipt_number,
            donor_id: receipt.donor_id,
            receipt_type: receipt.receipt_type,
            fiscal_year: receipt.fiscal_year,
            total_amount: receipt.total_amount,
            tax_deductible: receipt.tax_deductible,
            issued_at: receipt.issued_at,
            file_url: None,
            created_at: Utc::now(),
        };
        tables.receipts.push(receipt.clone());
        Ok(Some(receipt))
    }

    async fn set_receipt_file(&self, id: Uuid, file_url: &str) -> AppResult<Option<Receipt>> {
        let mut tables = self.lock();
        let Some(receipt) = tables.receipts.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if receipt.file_url.is_none() {
            receipt.file_url = Some(file_url.to_string());
        }
        Ok(Some(receipt.clone()))
    }

    async fn list_receipts(
        &self,
        donor_id: Option<Uuid>,
        fiscal_year: Option<i32>,
    ) -> AppResult<Vec<Receipt>> {
        let mut receipts: Vec<Receipt> = self
            .lock()
            .receipts
            .iter()
            .filter(|r| donor_id.is_none_or(|id| r.donor_id == id))
            .filter(|r| fiscal_year.is_none_or(|y| r.fiscal_year == y))
            .cloned()
            .collect();
        receipts.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(receipts)
    }

    // ─── Settings ─────────────────────────────────────────────────────────

    async fn get_setting(&self, key: &str) -> AppResult<Option<SystemSetting>> {
        Ok(self.lock().settings.get(key).cloned())
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> AppResult<SystemSetting> {
        let setting = SystemSetting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        };
        self.lock()
            .settings
            .insert(key.to_string(), setting.clone());
        Ok(setting)
    }

    async fn delete_setting(&self, key: &str) -> AppResult<bool> {
        Ok(self.lock().settings.remove(key).is_some())
    }

    // ─── Aloka Puja ───────────────────────────────────────────────────────

    async fn insert_puja(&self, puja: NewAlokaPuja) -> AppResult<AlokaPuja> {
        let now = Utc::now();
        let puja = AlokaPuja {
            id: Uuid::new_v4(),
            donor_id: puja.donor_id,
            puja_date: puja.puja_date,
            puja_type: puja.puja_type,
            notes: puja.notes,
            notify_staff: puja.notify_staff,
            remembered_persons: Json(puja.remembered_persons),
            notification_sent: false,
            notification_sent_at: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().pujas.push(puja.clone());
        Ok(puja)
    }

    async fn find_puja(&self, id: Uuid) -> AppResult<Option<AlokaPuja>> {
        Ok(self.lock().pujas.iter().find(|p| p.id == id).cloned())
    }

    async fn list_pujas(
        &self,
        donor_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<AlokaPuja>> {
        let mut pujas: Vec<AlokaPuja> = self
            .lock()
            .pujas
            .iter()
            .filter(|p| donor_id.is_none_or(|id| p.donor_id == id))
            .filter(|p| from.is_none_or(|from| p.puja_date >= from))
            .filter(|p| to.is_none_or(|to| p.puja_date <= to))
            .cloned()
            .collect();
        pujas.sort_by(|a, b| a.puja_date.cmp(&b.puja_date));
        Ok(pujas)
    }

    async fn pujas_awaiting_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<AlokaPuja>> {
        let mut pujas: Vec<AlokaPuja> = self
            .lock()
            .pujas
            .iter()
            .filter(|p| !p.notification_sent && p.puja_date >= from && p.puja_date < until)
            .cloned()
            .collect();
        pujas.sort_by(|a, b| a.puja_date.cmp(&b.puja_date));
        Ok(pujas)
    }

    async fn update_puja(
        &self,
        id: Uuid,
        changes: UpdateAlokaPujaRequest,
    ) -> AppResult<Option<AlokaPuja>> {
        let mut tables = self.lock();
        let Some(puja) = tables.pujas.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.puja_date {
            puja.puja_date = v;
        }
        if let Some(v) = changes.puja_type {
            puja.puja_type = v;
        }
        if let Some(v) = changes.notify_staff {
            puja.notify_staff = v;
        }
        if changes.notes.is_some() {
            puja.notes = changes.notes;
        }
        if let Some(v) = changes.remembered_persons {
            puja.remembered_persons = Json(v);
        }
        puja.updated_at = Utc::now();
        Ok(Some(puja.clone()))
    }

    async fn mark_puja_notified(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.lock();
        if let Some(puja) = tables.pujas.iter_mut().find(|p| p.id == id) {
            puja.notification_sent = true;
            puja.notification_sent_at = Some(at);
            puja.updated_at = at;
        }
        Ok(())
    }

    async fn delete_puja(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.lock();
        let before = tables.pujas.len();
        tables.pujas.retain(|p| p.id != id);
        Ok(tables.pujas.len() < before)
    }
}
