use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;

/// Landing page with links to the docs and an overview of the routes
pub async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let org = &state.config.organization;
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0"/>
  <title>{name} · Donations API</title>
  <style>
    * {{ box-sizing: border-box; margin: 0; padding: 0; }}
    body {{ font-family: Georgia, 'Times New Roman', serif; background: #fdf8f0; color: #3b2f1e; padding: 40px 20px; }}
    .container {{ max-width: 820px; margin: 0 auto; }}
    header {{ text-align: center; margin-bottom: 40px; }}
    header h1 {{ font-size: 2.4rem; color: #9a3412; margin-bottom: 8px; }}
    header p {{ color: #78716c; }}
    .grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(240px, 1fr)); gap: 16px; margin-bottom: 32px; }}
    .card {{ background: #fff; border: 1px solid #e7d8c0; border-radius: 10px; padding: 18px; }}
    .card h3 {{ font-size: 1rem; margin-bottom: 6px; }}
    .card p {{ font-size: 0.9rem; color: #78716c; line-height: 1.5; }}
    .card a {{ color: #c2410c; display: inline-block; margin-top: 8px; }}
    table {{ width: 100%; border-collapse: collapse; background: #fff; border: 1px solid #e7d8c0; }}
    td {{ padding: 6px 10px; border-bottom: 1px solid #f3ead9; font-size: 0.85rem; }}
    td.m {{ font-family: monospace; font-weight: bold; width: 70px; color: #9a3412; }}
    td.p {{ font-family: monospace; }}
    footer {{ text-align: center; margin-top: 32px; color: #a8a29e; font-size: 0.85rem; }}
  </style>
</head>
<body>
<div class="container">
  <header>
    <h1>{name}</h1>
    <p>Donations, year-end tax receipts and Aloka Puja bookings</p>
  </header>

  <div class="grid">
    <div class="card">
      <h3>API Documentation</h3>
      <p>Interactive Swagger UI with every endpoint and schema.</p>
      <a href="/docs">Open Swagger UI</a>
    </div>
    <div class="card">
      <h3>Health Check</h3>
      <p>Service and database status.</p>
      <a href="/health">GET /health</a>
    </div>
    <div class="card">
      <h3>Contact</h3>
      <p>{contact}</p>
    </div>
  </div>

  <table>
    <tr><td class="m">POST</td><td class="p">/api/v1/auth/register</td><td>Create a donor account (pending approval)</td></tr>
    <tr><td class="m">POST</td><td class="p">/api/v1/auth/login</td><td>Log in and get a JWT</td></tr>
    <tr><td class="m">GET</td><td class="p">/api/v1/donation-causes</td><td>Active donation causes</td></tr>
    <tr><td class="m">POST</td><td class="p">/api/v1/donations</td><td>Record a donation</td></tr>
    <tr><td class="m">POST</td><td class="p">/api/v1/donations/public</td><td>Record a walk-in donation</td></tr>
    <tr><td class="m">PATCH</td><td class="p">/api/v1/donations/{{id}}/validate</td><td>Validate or cancel a pending donation</td></tr>
    <tr><td class="m">POST</td><td class="p">/api/v1/receipts/year-end/{{year}}</td><td>Issue year-end tax receipts</td></tr>
    <tr><td class="m">POST</td><td class="p">/api/v1/receipts/self/year/{{year}}</td><td>Generate your own receipt</td></tr>
    <tr><td class="m">GET</td><td class="p">/api/v1/receipts/{{id}}/download</td><td>Receipt PDF link</td></tr>
    <tr><td class="m">POST</td><td class="p">/api/v1/aloka-puja</td><td>Book an Aloka Puja</td></tr>
    <tr><td class="m">GET</td><td class="p">/api/v1/reports/export/csv</td><td>Export donations as CSV</td></tr>
  </table>

  <footer>
    <p>Registered charity {registration}</p>
  </footer>
</div>
</body>
</html>"#,
        name = org.name,
        contact = org.contact_email,
        registration = org.registration_number,
    ))
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "service": "donation-system",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}
