//! Persistence seam. Handlers and services talk to `dyn Store`; production
//! wires in [`PgStore`], tests use the in-memory store.

mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgStore;

use crate::{
    errors::AppResult,
    models::{
        AlokaPuja, Donation, DonationCause, DonationChanges, DonationDecision, DonationFilter,
        DonationStatus, Donor, NewAlokaPuja, NewDonation, NewDonor, NewReceipt, NewUser, Receipt,
        ReceiptType, SystemSetting, UpdateAlokaPujaRequest, UpdateDonorRequest, User, YearTotals,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> AppResult<()>;

    // ─── Users ────────────────────────────────────────────────────────────
    /// Creates a user and its donor profile in one transaction.
    async fn create_user_with_donor(&self, user: NewUser, donor: NewDonor)
    -> AppResult<(User, Donor)>;
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
    /// Looks a user up by email, phone or username.
    async fn find_user_by_identifier(&self, identifier: &str) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    /// Activates the user and its linked donor profile.
    async fn activate_user(&self, id: Uuid) -> AppResult<Option<User>>;

    // ─── Donors ───────────────────────────────────────────────────────────
    async fn insert_donor(&self, donor: NewDonor) -> AppResult<Donor>;
    async fn find_donor(&self, id: Uuid) -> AppResult<Option<Donor>>;
    async fn find_donor_by_user(&self, user_id: Uuid) -> AppResult<Option<Donor>>;
    async fn list_donors(&self, active_only: bool) -> AppResult<Vec<Donor>>;
    async fn count_donors(&self) -> AppResult<i64>;
    async fn update_donor(&self, id: Uuid, changes: UpdateDonorRequest)
    -> AppResult<Option<Donor>>;
    async fn family_members(&self, primary_donor_id: Uuid) -> AppResult<Vec<Donor>>;
    async fn set_donor_active(&self, id: Uuid, active: bool) -> AppResult<bool>;
    async fn delete_donor(&self, id: Uuid) -> AppResult<bool>;

    // ─── Causes ───────────────────────────────────────────────────────────
    async fn find_cause(&self, id: Uuid) -> AppResult<Option<DonationCause>>;
    /// Case-insensitive name lookup.
    async fn find_cause_by_name(&self, name: &str) -> AppResult<Option<DonationCause>>;
    /// Inserts a cause; `None` when a cause with the same name (any case)
    /// already exists.
    async fn insert_cause(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Option<DonationCause>>;
    async fn list_causes(&self, active_only: bool) -> AppResult<Vec<DonationCause>>;

    // ─── Donations ────────────────────────────────────────────────────────
    async fn insert_donation(&self, donation: NewDonation) -> AppResult<Donation>;
    async fn find_donation(&self, id: Uuid) -> AppResult<Option<Donation>>;
    /// Newest first.
    async fn list_donations(&self, filter: &DonationFilter) -> AppResult<Vec<Donation>>;
    async fn count_donations(&self, status: Option<DonationStatus>) -> AppResult<i64>;
    async fn count_donor_donations(&self, donor_id: Uuid) -> AppResult<i64>;
    /// Applies the decision only if the donation is still pending; `None`
    /// when it is missing or already decided.
    async fn decide_donation(
        &self,
        id: Uuid,
        decision: DonationDecision,
    ) -> AppResult<Option<Donation>>;
    /// Rewrites a donation that is still pending; `None` otherwise.
    async fn update_pending_donation(
        &self,
        id: Uuid,
        changes: DonationChanges,
    ) -> AppResult<Option<Donation>>;
    async fn delete_donation(&self, id: Uuid) -> AppResult<bool>;
    /// Sums validated, tax-deductible donations of `donor_id` recorded in
    /// `[from, until)`.
    async fn donor_totals(
        &self,
        donor_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<YearTotals>;

    // ─── Receipts ─────────────────────────────────────────────────────────
    async fn find_receipt(&self, id: Uuid) -> AppResult<Option<Receipt>>;
    async fn find_receipt_for(
        &self,
        donor_id: Uuid,
        fiscal_year: i32,
        receipt_type: ReceiptType,
    ) -> AppResult<Option<Receipt>>;
    /// Inserts a receipt; `None` when one already exists for the same
    /// (donor, year, type). A taken receipt number is a `Conflict`.
    async fn insert_receipt(&self, receipt: NewReceipt) -> AppResult<Option<Receipt>>;
    /// Sets the PDF location of a receipt that has none yet. Returns the
    /// receipt as stored afterwards.
    async fn set_receipt_file(&self, id: Uuid, file_url: &str) -> AppResult<Option<Receipt>>;
    /// Newest first.
    async fn list_receipts(
        &self,
        donor_id: Option<Uuid>,
        fiscal_year: Option<i32>,
    ) -> AppResult<Vec<Receipt>>;

    // ─── Settings ─────────────────────────────────────────────────────────
    async fn get_setting(&self, key: &str) -> AppResult<Option<SystemSetting>>;
    async fn upsert_setting(&self, key: &str, value: &str) -> AppResult<SystemSetting>;
    async fn delete_setting(&self, key: &str) -> AppResult<bool>;

    // ─── Aloka Puja ───────────────────────────────────────────────────────
    async fn insert_puja(&self, puja: NewAlokaPuja) -> AppResult<AlokaPuja>;
    async fn find_puja(&self, id: Uuid) -> AppResult<Option<AlokaPuja>>;
    /// Ordered by date ascending. Bounds are inclusive.
    async fn list_pujas(
        &self,
        donor_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<AlokaPuja>>;
    /// Bookings in `[from, until)` that have not been reminded yet.
    async fn pujas_awaiting_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<AlokaPuja>>;
    async fn update_puja(
        &self,
        id: Uuid,
        changes: UpdateAlokaPujaRequest,
    ) -> AppResult<Option<AlokaPuja>>;
    async fn mark_puja_notified(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
    async fn delete_puja(&self, id: Uuid) -> AppResult<bool>;
}
