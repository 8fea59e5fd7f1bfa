//! Visit Ledger: binary entrypoint
//! Boots the Axum HTTP server through Shuttle.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    visit_ledger::telemetry::init();

    let router = visit_ledger::app().await?;
    Ok(router.into())
}
