// src/routes/mod.rs

use crate::{
    handlers::{
        account::{approve_user, list_users, login, register},
        aloka_puja, causes::list_causes, donations, donors,
        general::{health_handler, root_handler},
        payments, receipts, reports,
    },
    services::donations::MAX_ATTACHMENT_BYTES,
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use tower_http::services::ServeDir;

// Attachment plus the other form fields
const VALIDATE_BODY_LIMIT: usize = MAX_ATTACHMENT_BYTES + 64 * 1024;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Auth ─────────────────────────────────────────────
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/users", get(list_users))
        .route("/auth/users/{user_id}/approve", patch(approve_user))
        // ─── Donors ───────────────────────────────────────────
        .route(
            "/donors/me",
            get(donors::get_my_profile).patch(donors::update_my_profile),
        )
        .route("/donors", get(donors::list_donors).post(donors::create_donor))
        .route(
            "/donors/{donor_id}",
            get(donors::get_donor)
                .patch(donors::update_donor)
                .delete(donors::delete_donor),
        )
        .route(
            "/donors/{donor_id}/family-members",
            get(donors::list_family_members).post(donors::add_family_member),
        )
        // ─── Donations ────────────────────────────────────────
        .route("/donation-causes", get(list_causes))
        .route("/donations", post(donations::create).get(donations::list))
        .route("/donations/public", post(donations::create_public))
        .route("/donations/my-donations", get(donations::my_donations))
        .route(
            "/donations/{donation_id}",
            get(donations::get)
                .patch(donations::update)
                .delete(donations::delete),
        )
        .route(
            "/donations/{donation_id}/validate",
            patch(donations::validate).layer(DefaultBodyLimit::max(VALIDATE_BODY_LIMIT)),
        )
        // ─── Receipts ─────────────────────────────────────────
        .route("/receipts", get(receipts::list))
        .route("/receipts/my-receipts", get(receipts::my_receipts))
        .route("/receipts/year-end/{fiscal_year}", post(receipts::reconcile))
        .route(
            "/receipts/year-end/{fiscal_year}/unlock",
            post(receipts::unlock),
        )
        .route("/receipts/year-end/{fiscal_year}/lock", post(receipts::lock))
        .route(
            "/receipts/year-end/{fiscal_year}/status",
            get(receipts::status),
        )
        .route("/receipts/self/year/{year}", post(receipts::generate_self))
        .route("/receipts/{receipt_id}", get(receipts::get))
        .route("/receipts/{receipt_id}/download", get(receipts::download))
        // ─── Reports ──────────────────────────────────────────
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/reports/donations", get(reports::donations))
        .route("/reports/financial/by-cause", get(reports::by_cause))
        .route("/reports/financial/by-type", get(reports::by_type))
        .route(
            "/reports/tax-receipts/{fiscal_year}",
            get(reports::tax_receipts),
        )
        .route("/reports/export/csv", get(reports::export_csv))
        // ─── Aloka Puja ───────────────────────────────────────
        .route(
            "/aloka-puja",
            post(aloka_puja::create).get(aloka_puja::list),
        )
        .route("/aloka-puja/my-pujas", get(aloka_puja::my_pujas))
        .route("/aloka-puja/upcoming/{days}", get(aloka_puja::upcoming))
        .route("/aloka-puja/reminders/run", post(aloka_puja::run_reminders))
        .route(
            "/aloka-puja/{puja_id}",
            get(aloka_puja::get)
                .patch(aloka_puja::update)
                .delete(aloka_puja::delete),
        )
        // ─── Payments ─────────────────────────────────────────
        .route("/payments/card/process", post(payments::process))
        .route("/payments/card/simulate", post(payments::simulate))
}

/// Everything except the docs and the HTTP middleware, which `main` adds.
pub fn app_router(state: AppState) -> Router {
    let files = ServeDir::new(&state.config.storage_dir);
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api/v1", api_routes())
        .nest_service("/files", files)
        .with_state(state)
}
