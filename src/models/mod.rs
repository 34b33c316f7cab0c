// src/models/mod.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, types::Json};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Response Envelope ────────────────────────────────────────────────────────

/// `{success, data?, message?}` wrapper used by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

// ─── Users ────────────────────────────────────────────────────────────────────

// Postgres enums need #[sqlx(type_name = "...")] and must match the migration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Accountant,
    Volunteer,
    Donor,
}

impl UserRole {
    pub fn is_staff(self) -> bool {
        !matches!(self, UserRole::Donor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        UserPublic {
            id: user.id,
            email: user.email,
            phone: user.phone,
            username: user.username,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub landline: Option<String>,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email, phone number or username
    #[serde(alias = "email")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPublic,
    pub donor: Option<Donor>,
}

// ─── Donors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    /// Set on family members; points at the donor heading the family
    pub primary_donor_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub landline: Option<String>,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewDonor {
    pub user_id: Option<Uuid>,
    pub primary_donor_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub landline: Option<String>,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonorRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub landline: Option<String>,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDonorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub landline: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfile {
    #[serde(flatten)]
    pub donor: Donor,
    pub family_members: Vec<Donor>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DonorQuery {
    /// Hide deactivated donors
    pub active_only: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DonorRemoval {
    Deleted,
    Deactivated,
}

// ─── Donation Causes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonationCause {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_tax_deductible: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ─── Donations ────────────────────────────────────────────────────────────────

/// Payment channel the donation arrived through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "donation_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DonationType {
    Cash,
    Cheque,
    CreditCard,
    DebitCard,
    Interac,
    Eft,
    CanadaHelps,
    InKind,
}

impl DonationType {
    pub fn as_str(self) -> &'static str {
        match self {
            DonationType::Cash => "CASH",
            DonationType::Cheque => "CHEQUE",
            DonationType::CreditCard => "CREDIT_CARD",
            DonationType::DebitCard => "DEBIT_CARD",
            DonationType::Interac => "INTERAC",
            DonationType::Eft => "EFT",
            DonationType::CanadaHelps => "CANADA_HELPS",
            DonationType::InKind => "IN_KIND",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq,
)]
#[sqlx(type_name = "currency", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Cad,
    Usd,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Cad => "CAD",
            Currency::Usd => "USD",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "donation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DonationStatus {
    PendingValidation,
    Validated,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DonationStatus::PendingValidation => "PENDING_VALIDATION",
            DonationStatus::Validated => "VALIDATED",
            DonationStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: Uuid,
    /// `None` for walk-in donations submitted through the public form
    pub donor_id: Option<Uuid>,
    pub cause_id: Uuid,
    #[serde(rename = "type")]
    pub donation_type: DonationType,
    pub status: DonationStatus,
    pub amount: Decimal,
    pub currency: Currency,
    pub processor_fees: Option<Decimal>,
    pub net_amount: Decimal,
    pub donor_remarks: Option<String>,
    pub temple_remarks: Option<String>,
    /// Proof of payment uploaded during validation
    pub attachment_url: Option<String>,
    pub is_anonymous: bool,
    pub is_tax_deductible: bool,
    pub recorded_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub donor_id: Option<Uuid>,
    pub cause_id: Uuid,
    pub donation_type: DonationType,
    pub status: DonationStatus,
    pub amount: Decimal,
    pub currency: Currency,
    pub processor_fees: Option<Decimal>,
    pub net_amount: Decimal,
    pub donor_remarks: Option<String>,
    pub temple_remarks: Option<String>,
    pub is_anonymous: bool,
    pub is_tax_deductible: bool,
    pub recorded_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationRequest {
    /// Cause id, or a cause name when the donor picked a free-form cause
    pub cause_id: String,
    #[serde(rename = "type")]
    pub donation_type: DonationType,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
    pub processor_fees: Option<Decimal>,
    pub donor_remarks: Option<String>,
    pub temple_remarks: Option<String>,
    pub is_anonymous: Option<bool>,
    pub other_cause: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDonationRequest {
    #[serde(deserialize_with = "booleanish")]
    #[schema(value_type = bool)]
    pub approved: bool,
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDonationRequest {
    #[serde(rename = "type")]
    pub donation_type: Option<DonationType>,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub processor_fees: Option<Decimal>,
    pub donor_remarks: Option<String>,
    pub temple_remarks: Option<String>,
    pub is_anonymous: Option<bool>,
    pub is_tax_deductible: Option<bool>,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Fields rewritten by a staff edit of a pending donation
#[derive(Debug, Clone)]
pub struct DonationChanges {
    pub donation_type: DonationType,
    pub amount: Decimal,
    pub currency: Currency,
    pub processor_fees: Option<Decimal>,
    pub net_amount: Decimal,
    pub donor_remarks: Option<String>,
    pub temple_remarks: Option<String>,
    pub is_anonymous: bool,
    pub is_tax_deductible: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of a staff validation, applied atomically to a pending donation
#[derive(Debug, Clone)]
pub struct DonationDecision {
    pub status: DonationStatus,
    pub temple_remarks: Option<String>,
    pub attachment_url: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DonationFilter {
    pub status: Option<DonationStatus>,
    pub donor_id: Option<Uuid>,
    pub cause_id: Option<Uuid>,
    /// Inclusive lower bound on `recordedAt`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `recordedAt`
    pub to: Option<DateTime<Utc>>,
}

/// Sums over a donor's validated, tax-deductible donations for one fiscal year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct YearTotals {
    pub total_amount: Decimal,
    pub tax_deductible: Decimal,
    pub donation_count: i64,
}

/// Accepts `true`/`false` as well as the multipart-friendly `"true"`/`"1"`.
fn booleanish<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Booleanish {
        Bool(bool),
        Text(String),
    }

    Ok(match Booleanish::deserialize(deserializer)? {
        Booleanish::Bool(b) => b,
        Booleanish::Text(s) => parse_booleanish(&s),
    })
}

pub fn parse_booleanish(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

// ─── Receipts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "receipt_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptType {
    TaxReceipt,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: Uuid,
    pub receipt_number: String,
    pub donor_id: Uuid,
    pub receipt_type: ReceiptType,
    pub fiscal_year: i32,
    pub total_amount: Decimal,
    pub tax_deductible: Decimal,
    pub issued_at: DateTime<Utc>,
    /// Location of the rendered PDF; `None` until the first render succeeds
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub receipt_number: String,
    pub donor_id: Uuid,
    pub receipt_type: ReceiptType,
    pub fiscal_year: i32,
    pub total_amount: Decimal,
    pub tax_deductible: Decimal,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub created: u32,
    pub skipped: u32,
    pub errors: u32,
    pub year: i32,
    pub ready_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct YearEndStatus {
    pub year: i32,
    pub unlocked: bool,
    pub issued_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDownload {
    pub receipt_id: Uuid,
    pub receipt_number: String,
    pub receipt_url: String,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReceiptFilter {
    pub fiscal_year: Option<i32>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReconcileQuery {
    /// Restrict the run to a single donor
    pub donor_id: Option<Uuid>,
}

// ─── System Settings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

// ─── Aloka Puja ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RememberedPerson {
    pub first_name: String,
    pub last_name: String,
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlokaPuja {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub puja_date: DateTime<Utc>,
    pub puja_type: String,
    pub notes: Option<String>,
    pub notify_staff: bool,
    #[schema(value_type = Vec<RememberedPerson>)]
    pub remembered_persons: Json<Vec<RememberedPerson>>,
    pub notification_sent: bool,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAlokaPuja {
    pub donor_id: Uuid,
    pub puja_date: DateTime<Utc>,
    pub puja_type: String,
    pub notes: Option<String>,
    pub notify_staff: bool,
    pub remembered_persons: Vec<RememberedPerson>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlokaPujaRequest {
    /// Staff only: book on behalf of this donor
    pub donor_id: Option<Uuid>,
    pub puja_date: DateTime<Utc>,
    pub puja_type: String,
    pub notify_staff: Option<bool>,
    pub notes: Option<String>,
    #[serde(default)]
    pub remembered_persons: Vec<RememberedPerson>,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlokaPujaRequest {
    pub puja_date: Option<DateTime<Utc>>,
    pub puja_type: Option<String>,
    pub notify_staff: Option<bool>,
    pub notes: Option<String>,
    pub remembered_persons: Option<Vec<RememberedPerson>>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PujaFilter {
    pub donor_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReminderRunQuery {
    /// Defaults to the configured reminder horizon
    pub days_ahead: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSummary {
    pub days_ahead: i64,
    pub total: u32,
    pub sent: u32,
    pub errors: u32,
}

// ─── Reports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_donations: i64,
    pub pending_validation: i64,
    /// Sum of validated donations only
    pub total_amount: Decimal,
    pub donors_count: i64,
    pub recent_donations: Vec<Donation>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialBreakdown {
    pub key: String,
    pub count: i64,
    pub total_amount: Decimal,
    pub net_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaxReceiptReport {
    pub fiscal_year: i32,
    pub unlocked: bool,
    pub receipt_count: i64,
    pub total_amount: Decimal,
    pub tax_deductible: Decimal,
    pub receipts: Vec<Receipt>,
}

// ─── Payments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Live,
    #[default]
    Test,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardPaymentRequest {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub card_number: String,
    pub exp_month: u32,
    /// Two-digit year, e.g. 27 for 2027
    pub exp_year: u32,
    pub cvc: String,
    pub mode: Option<PaymentMode>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardPaymentResult {
    pub transaction_id: String,
    pub authorization_code: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub simulated: bool,
    pub mode: PaymentMode,
    pub last4: String,
}

// ─── JWT Claims ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}
