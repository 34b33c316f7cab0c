use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod auth;
mod config;
mod errors;
mod handlers;
mod models;
mod openapi;
mod routes;
mod services;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use config::Config;
use openapi::ApiDoc;
use routes::app_router;
use services::{email::EmailService, scheduler, storage::FileDocumentStore};
use state::AppState;
use store::PgStore;

#[tokio::main]
async fn main() {
    // ─── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("donation_system=debug,tower_http=info")),
        )
        .with_max_level(Level::TRACE)
        .init();

    // ─── Config ───────────────────────────────────────────────────────────────
    let config = Config::from_env();
    let addr = config.server_addr();

    // ─── Database ─────────────────────────────────────────────────────────────
    let db = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    info!("Database connected and migrations applied");

    // ─── Services ─────────────────────────────────────────────────────────────
    let email = EmailService::new(&config).expect("Failed to configure SMTP transport");
    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .expect("Failed to create storage directory");
    let documents = FileDocumentStore::new(config.storage_dir.clone());

    // ─── App State ────────────────────────────────────────────────────────────
    let state = AppState::new(
        Arc::new(PgStore::new(db)),
        config,
        Arc::new(email),
        Arc::new(documents),
    );

    match auth::seed_admin(&state).await {
        Ok(true) => info!("Seeded admin account from ADMIN_EMAIL"),
        Ok(false) => {}
        Err(e) => tracing::error!("Failed to seed admin account: {}", e),
    }

    // ─── Scheduler ────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handle = state
        .config
        .scheduler_enabled
        .then(|| scheduler::start(state.clone(), shutdown_rx));

    // ─── Router ───────────────────────────────────────────────────────────────
    let app = app_router(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // ─── Start Server ─────────────────────────────────────────────────────────
    info!("Donation System API listening on http://{}", addr);
    info!("Swagger UI:  http://{}/docs", addr);
    info!("Health:      http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .expect("Server failed");

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler_handle {
        let _ = handle.await;
    }
}
