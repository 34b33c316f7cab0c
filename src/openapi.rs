// src/openapi.rs

use crate::models::{
    AlokaPuja, AuthResponse, CardPaymentRequest, CardPaymentResult, CreateAlokaPujaRequest,
    CreateDonationRequest, CreateDonorRequest, Currency, DashboardStats, Donation, DonationCause,
    DonationStatus, DonationType, Donor, DonorProfile, DonorRemoval, FinancialBreakdown,
    LoginRequest, PaymentMode, Receipt, ReceiptDownload, ReceiptType, ReconciliationSummary,
    RegisterRequest, RememberedPerson, ReminderSummary, TaxReceiptReport,
    UpdateAlokaPujaRequest, UpdateDonationRequest, UpdateDonorRequest, UserPublic, UserRole,
    ValidateDonationRequest, YearEndStatus,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Temple Donation Management API",
        version = "1.0.0",
        description = "Donation recording and validation, year-end tax receipts, \
            Aloka Puja bookings with reminders, and financial reports for a \
            registered charity.",
        license(name = "MIT")
    ),
    paths(
        // Auth
        crate::handlers::account::register,
        crate::handlers::account::login,
        crate::handlers::account::list_users,
        crate::handlers::account::approve_user,
        // Donors
        crate::handlers::donors::get_my_profile,
        crate::handlers::donors::update_my_profile,
        crate::handlers::donors::list_donors,
        crate::handlers::donors::create_donor,
        crate::handlers::donors::get_donor,
        crate::handlers::donors::update_donor,
        crate::handlers::donors::delete_donor,
        crate::handlers::donors::list_family_members,
        crate::handlers::donors::add_family_member,
        // Donations
        crate::handlers::causes::list_causes,
        crate::handlers::donations::create,
        crate::handlers::donations::create_public,
        crate::handlers::donations::list,
        crate::handlers::donations::my_donations,
        crate::handlers::donations::get,
        crate::handlers::donations::update,
        crate::handlers::donations::delete,
        crate::handlers::donations::validate,
        // Receipts
        crate::handlers::receipts::reconcile,
        crate::handlers::receipts::unlock,
        crate::handlers::receipts::lock,
        crate::handlers::receipts::status,
        crate::handlers::receipts::generate_self,
        crate::handlers::receipts::download,
        crate::handlers::receipts::my_receipts,
        crate::handlers::receipts::list,
        crate::handlers::receipts::get,
        // Reports
        crate::handlers::reports::dashboard,
        crate::handlers::reports::donations,
        crate::handlers::reports::by_cause,
        crate::handlers::reports::by_type,
        crate::handlers::reports::tax_receipts,
        crate::handlers::reports::export_csv,
        // Aloka Puja
        crate::handlers::aloka_puja::my_pujas,
        crate::handlers::aloka_puja::create,
        crate::handlers::aloka_puja::list,
        crate::handlers::aloka_puja::get,
        crate::handlers::aloka_puja::update,
        crate::handlers::aloka_puja::delete,
        crate::handlers::aloka_puja::upcoming,
        crate::handlers::aloka_puja::run_reminders,
        // Payments
        crate::handlers::payments::process,
        crate::handlers::payments::simulate,
    ),
    components(
        schemas(
            RegisterRequest, LoginRequest, AuthResponse, UserPublic, UserRole,
            Donor, DonorProfile, CreateDonorRequest, UpdateDonorRequest, DonorRemoval,
            DonationCause, Donation, DonationType, DonationStatus, Currency,
            CreateDonationRequest, UpdateDonationRequest, ValidateDonationRequest,
            Receipt, ReceiptType, ReceiptDownload, ReconciliationSummary, YearEndStatus,
            AlokaPuja, RememberedPerson, CreateAlokaPujaRequest, UpdateAlokaPujaRequest,
            ReminderSummary,
            DashboardStats, FinancialBreakdown, TaxReceiptReport,
            CardPaymentRequest, CardPaymentResult, PaymentMode,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Register, log in and approve accounts"),
        (name = "Donors", description = "Donor profiles and family members"),
        (name = "Donations", description = "Record, validate and manage donations"),
        (name = "Receipts", description = "Year-end tax receipts"),
        (name = "Reports", description = "Dashboards, breakdowns and CSV export"),
        (name = "Aloka Puja", description = "Bookings and reminders"),
        (name = "Payments", description = "Card payment simulator"),
    )
)]
pub struct ApiDoc;
