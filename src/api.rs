use std::collections::{BTreeMap, HashMap};
use std::num::IntErrorKind;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::error::{LedgerError, Result};
use crate::ledger::VisitLedger;

#[derive(Clone)]
pub struct AppState {
    ledger: Arc<VisitLedger>,
}

impl AppState {
    pub fn new(ledger: Arc<VisitLedger>) -> Self {
        Self { ledger }
    }
}

/// Build the HTTP router. `debug_routes` adds `/debug/buckets`.
pub fn create_router(state: AppState, debug_routes: bool) -> Router {
    let mut router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/hello_world", get(|| async { "hello" }))
        .route(
            "/visited_links",
            get(get_visited_links).post(post_visited_links),
        );
    if debug_routes {
        router = router.route("/debug/buckets", get(debug_buckets));
    }
    router.layer(CorsLayer::very_permissive()).with_state(state)
}

/// Ingest body: `{"links": ["https://ya.ru", "funbox.ru"]}`.
#[derive(Debug, serde::Deserialize)]
pub struct VisitBatch {
    pub links: Vec<String>,
}

impl VisitBatch {
    /// Structural validation only; links are normalized later by the ledger.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let batch: VisitBatch = serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(error = %e, "malformed visit batch");
            LedgerError::MalformedInput
        })?;
        if batch.links.is_empty() {
            return Err(LedgerError::MalformedInput);
        }
        Ok(batch)
    }
}

#[derive(serde::Serialize)]
struct StatusResp {
    status: &'static str,
}

#[derive(serde::Serialize)]
struct DomainsResp {
    domains: Vec<String>,
    status: &'static str,
}

// Raw bytes instead of `Json<_>`: clients are not required to send a
// content-type, and every parse failure maps to the same 400 body.
async fn post_visited_links(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StatusResp>> {
    let batch = VisitBatch::parse(&body)?;
    state.ledger.ingest(batch.links.as_slice()).await?;
    Ok(Json(StatusResp { status: "ok" }))
}

async fn get_visited_links(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<DomainsResp>> {
    let (from, to) = parse_range(&q)?;
    let domains = state.ledger.query(from, to).await?;
    Ok(Json(DomainsResp {
        domains: domains.into_iter().collect(),
        status: "ok",
    }))
}

async fn debug_buckets(State(state): State<AppState>) -> Result<Json<BTreeMap<u64, usize>>> {
    Ok(Json(state.ledger.buckets().await?))
}

/// Both bounds must be present and non-empty before either is checked for digits.
pub(crate) fn parse_range(q: &HashMap<String, String>) -> Result<(u64, u64)> {
    let present = |k: &str| q.get(k).map(String::as_str).filter(|v| !v.is_empty());
    let (Some(from), Some(to)) = (present("from"), present("to")) else {
        return Err(LedgerError::MissingRange);
    };
    Ok((parse_bound(from)?, parse_bound(to)?))
}

/// Digits only. Values past `u64::MAX` saturate: no bucket can lie beyond them.
fn parse_bound(raw: &str) -> Result<u64> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LedgerError::NonNumericRange);
    }
    match raw.parse::<u64>() {
        Ok(v) => Ok(v),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(u64::MAX),
        Err(_) => Err(LedgerError::NonNumericRange),
    }
}
