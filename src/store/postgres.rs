// src/store/postgres.rs

use super::Store;
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
use sqlx::{PgPool, Postgres, Transaction, types::Json};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_donor_in(tx: &mut Transaction<'_, Postgres>, donor: &NewDonor) -> AppResult<Donor> {
    let donor = sqlx::query_as::<_, Donor>(
        r#"INSERT INTO donors (
            id, user_id, primary_donor_id, first_name, last_name, email, mobile, landline,
            address, city, province, postal_code, country, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,NOW(),NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(donor.user_id)
    .bind(donor.primary_donor_id)
    .bind(&donor.first_name)
    .bind(&donor.last_name)
    .bind(&donor.email)
    .bind(&donor.mobile)
    .bind(&donor.landline)
    .bind(&donor.address)
    .bind(&donor.city)
    .bind(&donor.province)
    .bind(&donor.postal_code)
    .bind(&donor.country)
    .bind(donor.is_active)
    .fetch_one(&mut **tx)
    .await?;

    Ok(donor)
}

async fn insert_user_in(tx: &mut Transaction<'_, Postgres>, user: &NewUser) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (id, email, phone, username, password_hash, role, is_active, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(user.is_active)
    .fetch_one(&mut **tx)
    .await?;

    Ok(user)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ─── Users ────────────────────────────────────────────────────────────

    async fn create_user_with_donor(
        &self,
        user: NewUser,
        donor: NewDonor,
    ) -> AppResult<(User, Donor)> {
        let mut tx = self.pool.begin().await?;
        let user = insert_user_in(&mut tx, &user).await?;
        let donor = insert_donor_in(
            &mut tx,
            &NewDonor {
                user_id: Some(user.id),
                ..donor
            },
        )
        .await?;
        tx.commit().await?;
        Ok((user, donor))
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;
        let user = insert_user_in(&mut tx, &user).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 OR phone = $1 OR username = $1 LIMIT 1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn activate_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let mut tx = self.pool.begin().await?;
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_active = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if user.is_some() {
            sqlx::query("UPDATE donors SET is_active = TRUE, updated_at = NOW() WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(user)
    }

    // ─── Donors ───────────────────────────────────────────────────────────

    async fn insert_donor(&self, donor: NewDonor) -> AppResult<Donor> {
        let mut tx = self.pool.begin().await?;
        let donor = insert_donor_in(&mut tx, &donor).await?;
        tx.commit().await?;
        Ok(donor)
    }

    async fn find_donor(&self, id: Uuid) -> AppResult<Option<Donor>> {
        let donor = sqlx::query_as::<_, Donor>("SELECT * FROM donors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(donor)
    }

    async fn find_donor_by_user(&self, user_id: Uuid) -> AppResult<Option<Donor>> {
        let donor = sqlx::query_as::<_, Donor>("SELECT * FROM donors WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(donor)
    }

    async fn list_donors(&self, active_only: bool) -> AppResult<Vec<Donor>> {
        let donors = sqlx::query_as::<_, Donor>(
            "SELECT * FROM donors WHERE ($1 = FALSE OR is_active) ORDER BY last_name, first_name",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(donors)
    }

    async fn count_donors(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM donors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_donor(
        &self,
        id: Uuid,
        changes: UpdateDonorRequest,
    ) -> AppResult<Option<Donor>> {
        let donor = sqlx::query_as::<_, Donor>(
            r#"UPDATE donors SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                mobile = COALESCE($5, mobile),
                landline = COALESCE($6, landline),
                address = COALESCE($7, address),
                city = COALESCE($8, city),
                province = COALESCE($9, province),
                postal_code = COALESCE($10, postal_code),
                country = COALESCE($11, country),
                updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.email)
        .bind(changes.mobile)
        .bind(changes.landline)
        .bind(changes.address)
        .bind(changes.city)
        .bind(changes.province)
        .bind(changes.postal_code)
        .bind(changes.country)
        .fetch_optional(&self.pool)
        .await?;
        Ok(donor)
    }

    async fn family_members(&self, primary_donor_id: Uuid) -> AppResult<Vec<Donor>> {
        let members = sqlx::query_as::<_, Donor>(
            "SELECT * FROM donors WHERE primary_donor_id = $1 ORDER BY first_name",
        )
        .bind(primary_donor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn set_donor_active(&self, id: Uuid, active: bool) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE donors SET is_active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_donor(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM donors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ─── Causes ───────────────────────────────────────────────────────────

    async fn find_cause(&self, id: Uuid) -> AppResult<Option<DonationCause>> {
        let cause = sqlx::query_as::<_, DonationCause>("SELECT * FROM donation_causes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(cause)
    }

    async fn find_cause_by_name(&self, name: &str) -> AppResult<Option<DonationCause>> {
        let cause = sqlx::query_as::<_, DonationCause>(
            "SELECT * FROM donation_causes WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cause)
    }

    async fn insert_cause(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Option<DonationCause>> {
        // Unique index on LOWER(name) turns a concurrent duplicate into a no-op
        let cause = sqlx::query_as::<_, DonationCause>(
            r#"INSERT INTO donation_causes (id, name, description, is_tax_deductible, is_active, created_at)
               VALUES ($1, $2, $3, TRUE, TRUE, NOW())
               ON CONFLICT DO NOTHING
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cause)
    }

    async fn list_causes(&self, active_only: bool) -> AppResult<Vec<DonationCause>> {
        let causes = sqlx::query_as::<_, DonationCause>(
            "SELECT * FROM donation_causes WHERE ($1 = FALSE OR is_active) ORDER BY name",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(causes)
    }

    // ─── Donations ────────────────────────────────────────────────────────

    async fn insert_donation(&self, donation: NewDonation) -> AppResult<Donation> {
        let donation = sqlx::query_as::<_, Donation>(
            r#"INSERT INTO donations (
                id, donor_id, cause_id, donation_type, status, amount, currency,
                processor_fees, net_amount, donor_remarks, temple_remarks, attachment_url,
                is_anonymous, is_tax_deductible, recorded_at, verified_at, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,NULL,$12,$13,$14,$15,NOW(),NOW())
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(donation.donor_id)
        .bind(donation.cause_id)
        .bind(donation.donation_type)
        .bind(donation.status)
        .bind(donation.amount)
        .bind(donation.currency)
        .bind(donation.processor_fees)
        .bind(donation.net_amount)
        .bind(donation.donor_remarks)
        .bind(donation.temple_remarks)
        .bind(donation.is_anonymous)
        .bind(donation.is_tax_deductible)
        .bind(donation.recorded_at)
        .bind(donation.verified_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(donation)
    }

    async fn find_donation(&self, id: Uuid) -> AppResult<Option<Donation>> {
        let donation = sqlx::query_as::<_, Donation>("SELECT * FROM donations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(donation)
    }

    async fn list_donations(&self, filter: &DonationFilter) -> AppResult<Vec<Donation>> {
        let donations = sqlx::query_as::<_, Donation>(
            r#"SELECT * FROM donations
               WHERE ($1::donation_status IS NULL OR status = $1)
                 AND ($2::uuid IS NULL OR donor_id = $2)
                 AND ($3::uuid IS NULL OR cause_id = $3)
                 AND ($4::timestamptz IS NULL OR recorded_at >= $4)
                 AND ($5::timestamptz IS NULL OR recorded_at <= $5)
               ORDER BY recorded_at DESC"#,
        )
        .bind(filter.status)
        .bind(filter.donor_id)
        .bind(filter.cause_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;
        Ok(donations)
    }

    async fn count_donations(&self, status: Option<DonationStatus>) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM donations WHERE ($1::donation_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_donor_donations(&self, donor_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM donations WHERE donor_id = $1")
            .bind(donor_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn decide_donation(
        &self,
        id: Uuid,
        decision: DonationDecision,
    ) -> AppResult<Option<Donation>> {
        let donation = sqlx::query_as::<_, Donation>(
            r#"UPDATE donations SET
                status = $2,
                temple_remarks = COALESCE($3, temple_remarks),
                attachment_url = COALESCE($4, attachment_url),
                verified_at = $5,
                updated_at = NOW()
               WHERE id = $1 AND status = 'PENDING_VALIDATION'
               RETURNING *"#,
        )
        .bind(id)
        .bind(decision.status)
        .bind(decision.temple_remarks)
        .bind(decision.attachment_url)
        .bind(decision.verified_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(donation)
    }

    async fn update_pending_donation(
        &self,
        id: Uuid,
        changes: DonationChanges,
    ) -> AppResult<Option<Donation>> {
        let donation = sqlx::query_as::<_, Donation>(
            r#"UPDATE donations SET
                donation_type = $2,
                amount = $3,
                currency = $4,
                processor_fees = $5,
                net_amount = $6,
                donor_remarks = $7,
                temple_remarks = $8,
                is_anonymous = $9,
                is_tax_deductible = $10,
                recorded_at = $11,
                updated_at = NOW()
               WHERE id = $1 AND status = 'PENDING_VALIDATION'
               RETURNING *"#,
        )
        .bind(id)
        .bind(changes.donation_type)
        .bind(changes.amount)
        .bind(changes.currency)
        .bind(changes.processor_fees)
        .bind(changes.net_amount)
        .bind(changes.donor_remarks)
        .bind(changes.temple_remarks)
        .bind(changes.is_anonymous)
        .bind(changes.is_tax_deductible)
        .bind(changes.recorded_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(donation)
    }

    async fn delete_donation(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM donations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn donor_totals(
        &self,
        donor_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<YearTotals> {
        let totals = sqlx::query_as::<_, YearTotals>(
            r#"SELECT
                COALESCE(SUM(amount), 0) AS total_amount,
                COALESCE(SUM(net_amount), 0) AS tax_deductible,
                COUNT(*) AS donation_count
               FROM donations
               WHERE donor_id = $1
                 AND status = 'VALIDATED'
                 AND is_tax_deductible
                 AND recorded_at >= $2
                 AND recorded_at < $3"#,
        )
        .bind(donor_id)
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    // ─── Receipts ─────────────────────────────────────────────────────────

    async fn find_receipt(&self, id: Uuid) -> AppResult<Option<Receipt>> {
        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(receipt)
    }

    async fn find_receipt_for(
        &self,
        donor_id: Uuid,
        fiscal_year: i32,
        receipt_type: ReceiptType,
    ) -> AppResult<Option<Receipt>> {
        let receipt = sqlx::query_as::<_, Receipt>(
            "SELECT * FROM receipts WHERE donor_id = $1 AND fiscal_year = $2 AND receipt_type = $3",
        )
        .bind(donor_id)
        .bind(fiscal_year)
        .bind(receipt_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(receipt)
    }

    async fn insert_receipt(&self, receipt: NewReceipt) -> AppResult<Option<Receipt>> {
        let receipt = sqlx::query_as::<_, Receipt>(
            r#"INSERT INTO receipts (
                id, receipt_number, donor_id, receipt_type, fiscal_year,
                total_amount, tax_deductible, issued_at, file_url, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,NULL,NOW())
            ON CONFLICT (donor_id, fiscal_year, receipt_type) DO NOTHING
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(&receipt.receipt_number)
        .bind(receipt.donor_id)
        .bind(receipt.receipt_type)
        .bind(receipt.fiscal_year)
        .bind(receipt.total_amount)
        .bind(receipt.tax_deductible)
        .bind(receipt.issued_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(receipt)
    }

    async fn set_receipt_file(&self, id: Uuid, file_url: &str) -> AppResult<Option<Receipt>> {
        // A receipt's file is written once; later calls just read it back
        let updated = sqlx::query_as::<_, Receipt>(
            "UPDATE receipts SET file_url = $2 WHERE id = $1 AND file_url IS NULL RETURNING *",
        )
        .bind(id)
        .bind(file_url)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(receipt) => Ok(Some(receipt)),
            None => self.find_receipt(id).await,
        }
    }

    async fn list_receipts(
        &self,
        donor_id: Option<Uuid>,
        fiscal_year: Option<i32>,
    ) -> AppResult<Vec<Receipt>> {
        let receipts = sqlx::query_as::<_, Receipt>(
            r#"SELECT * FROM receipts
               WHERE ($1::uuid IS NULL OR donor_id = $1)
                 AND ($2::int IS NULL OR fiscal_year = $2)
               ORDER BY issued_at DESC"#,
        )
        .bind(donor_id)
        .bind(fiscal_year)
        .fetch_all(&self.pool)
        .await?;
        Ok(receipts)
    }

    // ─── Settings ─────────────────────────────────────────────────────────

    async fn get_setting(&self, key: &str) -> AppResult<Option<SystemSetting>> {
        let setting = sqlx::query_as::<_, SystemSetting>("SELECT * FROM system_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(setting)
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> AppResult<SystemSetting> {
        let setting = sqlx::query_as::<_, SystemSetting>(
            r#"INSERT INTO system_settings (key, value, updated_at)
               VALUES ($1, $2, NOW())
               ON CONFLICT (key) DO UPDATE
               SET value = EXCLUDED.value,
                   updated_at = NOW()
               RETURNING *"#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;
        Ok(setting)
    }

    async fn delete_setting(&self, key: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM system_settings WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ─── Aloka Puja ───────────────────────────────────────────────────────

    async fn insert_puja(&self, puja: NewAlokaPuja) -> AppResult<AlokaPuja> {
        let puja = sqlx::query_as::<_, AlokaPuja>(
            r#"INSERT INTO aloka_pujas (
                id, donor_id, puja_date, puja_type, notes, notify_staff, remembered_persons,
                notification_sent, notification_sent_at, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,FALSE,NULL,NOW(),NOW())
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(puja.donor_id)
        .bind(puja.puja_date)
        .bind(puja.puja_type)
        .bind(puja.notes)
        .bind(puja.notify_staff)
        .bind(Json(puja.remembered_persons))
        .fetch_one(&self.pool)
        .await?;
        Ok(puja)
    }

    async fn find_puja(&self, id: Uuid) -> AppResult<Option<AlokaPuja>> {
        let puja = sqlx::query_as::<_, AlokaPuja>("SELECT * FROM aloka_pujas WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(puja)
    }

    async fn list_pujas(
        &self,
        donor_id: Option<Uuid>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<AlokaPuja>> {
        let pujas = sqlx::query_as::<_, AlokaPuja>(
            r#"SELECT * FROM aloka_pujas
               WHERE ($1::uuid IS NULL OR donor_id = $1)
                 AND ($2::timestamptz IS NULL OR puja_date >= $2)
                 AND ($3::timestamptz IS NULL OR puja_date <= $3)
               ORDER BY puja_date ASC"#,
        )
        .bind(donor_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(pujas)
    }

    async fn pujas_awaiting_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<AlokaPuja>> {
        let pujas = sqlx::query_as::<_, AlokaPuja>(
            r#"SELECT * FROM aloka_pujas
               WHERE puja_date >= $1 AND puja_date < $2 AND notification_sent = FALSE
               ORDER BY puja_date ASC"#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(pujas)
    }

    async fn update_puja(
        &self,
        id: Uuid,
        changes: UpdateAlokaPujaRequest,
    ) -> AppResult<Option<AlokaPuja>> {
        let puja = sqlx::query_as::<_, AlokaPuja>(
            r#"UPDATE aloka_pujas SET
                puja_date = COALESCE($2, puja_date),
                puja_type = COALESCE($3, puja_type),
                notify_staff = COALESCE($4, notify_staff),
                notes = COALESCE($5, notes),
                remembered_persons = COALESCE($6, remembered_persons),
                updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(changes.puja_date)
        .bind(changes.puja_type)
        .bind(changes.notify_staff)
        .bind(changes.notes)
        .bind(changes.remembered_persons.map(Json))
        .fetch_optional(&self.pool)
        .await?;
        Ok(puja)
    }

    async fn mark_puja_notified(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE aloka_pujas SET notification_sent = TRUE, notification_sent_at = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_puja(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM aloka_pujas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
